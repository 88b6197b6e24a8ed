// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! IR Schema Generation
//!
//! Generates the JSON Schema of [`WorkflowSpec`] from the Rust type
//! definitions using schemars.

use schemars::schema_for;
use serde_json::Value;

use crate::{IR_VERSION, WorkflowSpec};

/// Generate the JSON Schema for the workflow IR.
pub fn generate_ir_schema() -> Value {
    let schema = schema_for!(WorkflowSpec);
    let mut schema_json = serde_json::to_value(&schema).unwrap_or(Value::Null);

    if let Value::Object(ref mut map) = schema_json {
        map.insert(
            "x-ir-version".to_string(),
            Value::String(IR_VERSION.to_string()),
        );
    }

    schema_json
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_version_and_definitions() {
        let schema = generate_ir_schema();

        assert_eq!(schema["x-ir-version"], IR_VERSION);
        assert_eq!(schema["title"], "WorkflowSpec");
        let definitions = schema["definitions"].as_object().unwrap();
        for name in ["StepSpec", "EdgeSpec", "RetryPolicy", "StepKind", "Predicate"] {
            assert!(definitions.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn test_schema_is_strict() {
        let schema = generate_ir_schema();
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["definitions"]["StepSpec"]["additionalProperties"], false);
    }
}
