// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Runtime configuration for a generated workflow program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`
    pub llm_endpoint: Option<String>,
    /// Bearer token sent with LLM requests
    pub llm_api_key: Option<String>,
    /// Model used by LLM steps that do not name one
    pub llm_model: String,
    /// Upper bound on steps running at the same time
    pub max_workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            llm_endpoint: None,
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `DWC_LLM_ENDPOINT`: OpenAI-compatible API base (LLM steps fall back
    ///   to the synthesized answer when unset)
    /// - `DWC_LLM_API_KEY`: API key for the endpoint (requires
    ///   `DWC_LLM_ENDPOINT`)
    /// - `DWC_LLM_MODEL`: default model (default: gpt-4o-mini)
    /// - `DWC_MAX_WORKERS`: worker pool size (default: 4)
    pub fn from_env() -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_workers: usize = non_empty("DWC_MAX_WORKERS")
            .unwrap_or_else(|| DEFAULT_MAX_WORKERS.to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("DWC_MAX_WORKERS", "must be a positive integer"))?;
        if max_workers == 0 {
            return Err(ConfigError::Invalid(
                "DWC_MAX_WORKERS",
                "must be a positive integer",
            ));
        }

        let llm_endpoint = non_empty("DWC_LLM_ENDPOINT");
        let llm_api_key = non_empty("DWC_LLM_API_KEY");
        if llm_api_key.is_some() && llm_endpoint.is_none() {
            return Err(ConfigError::Missing("DWC_LLM_ENDPOINT"));
        }

        Ok(Self {
            llm_endpoint,
            llm_api_key,
            llm_model: non_empty("DWC_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            max_workers,
        })
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }
}

/// Load a `.env` file from the working directory or its parents, if any.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
