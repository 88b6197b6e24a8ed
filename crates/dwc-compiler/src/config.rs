// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::path::PathBuf;

use crate::codegen::CodegenOptions;

const DEFAULT_OUTPUT_DIR: &str = ".dwc/workflows";

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Root directory for generated artifacts
    pub output_dir: PathBuf,
    /// `dwc-runtime` version requirement written into generated crates
    pub runtime_version: String,
    /// Local `dwc-runtime` checkout used instead of the registry version
    pub runtime_path: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_path: None,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `DWC_OUTPUT_DIR`: artifact root (default: .dwc/workflows)
    /// - `DWC_RUNTIME_VERSION`: runtime version requirement (default: this
    ///   crate's version)
    /// - `DWC_RUNTIME_PATH`: path to a local dwc-runtime crate
    pub fn from_env() -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let runtime_version = non_empty("DWC_RUNTIME_VERSION").unwrap_or(defaults.runtime_version);
        if runtime_version
            .chars()
            .any(|c| c == '"' || c == '\\' || c.is_whitespace())
        {
            return Err(ConfigError::Invalid(
                "DWC_RUNTIME_VERSION",
                "must be a plain version requirement",
            ));
        }

        let runtime_path = non_empty("DWC_RUNTIME_PATH").map(PathBuf::from);
        if let Some(path) = &runtime_path
            && !path.is_dir()
        {
            return Err(ConfigError::Invalid("DWC_RUNTIME_PATH", "not a directory"));
        }

        Ok(Self {
            output_dir: non_empty("DWC_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            runtime_version,
            runtime_path,
        })
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            runtime_version: self.runtime_version.clone(),
            runtime_path: self.runtime_path.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in ["DWC_OUTPUT_DIR", "DWC_RUNTIME_VERSION", "DWC_RUNTIME_PATH"] {
                guard.vars.push((key.to_string(), env::var(key).ok()));
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe { env::remove_var(key) };
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..) {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::new();

        let config = CompilerConfig::from_env().unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.output_dir, PathBuf::from(".dwc/workflows"));
    }

    #[test]
    fn test_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();
        let runtime = tempfile::tempdir().unwrap();
        guard.set("DWC_OUTPUT_DIR", "/tmp/dwc-out");
        guard.set("DWC_RUNTIME_VERSION", "0.3.1");
        guard.set("DWC_RUNTIME_PATH", runtime.path().to_str().unwrap());

        let config = CompilerConfig::from_env().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/dwc-out"));
        assert_eq!(config.runtime_version, "0.3.1");
        let options = config.codegen_options();
        assert_eq!(options.runtime_path.as_deref(), Some(runtime.path()));
    }

    #[test]
    fn test_invalid_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("DWC_RUNTIME_VERSION", "0.3\"");
        assert!(matches!(
            CompilerConfig::from_env(),
            Err(ConfigError::Invalid("DWC_RUNTIME_VERSION", _))
        ));

        guard.set("DWC_RUNTIME_VERSION", "0.3");
        guard.set("DWC_RUNTIME_PATH", "/definitely/not/here");
        let err = CompilerConfig::from_env().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for DWC_RUNTIME_PATH: not a directory"
        );
    }
}
