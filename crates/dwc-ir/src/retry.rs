// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retry policy and backoff computation.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackoffStrategy {
    /// Wait `initial_delay_seconds` between every attempt.
    Fixed,
    /// Double the delay after every failed attempt, capped at `max_delay_seconds`.
    Exponential,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    30.0
}

/// Per-step retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Unset until retry-policy injection picks a per-kind default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_strategy: Option<BackoffStrategy>,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_strategy: None,
            initial_delay_seconds: default_initial_delay(),
            max_delay_seconds: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, initial_delay_seconds: f64) -> Self {
        Self {
            max_retries,
            backoff_strategy: Some(BackoffStrategy::Fixed),
            initial_delay_seconds,
            ..Self::default()
        }
    }

    pub fn exponential(max_retries: u32, initial_delay_seconds: f64, max_delay_seconds: f64) -> Self {
        Self {
            max_retries,
            backoff_strategy: Some(BackoffStrategy::Exponential),
            initial_delay_seconds,
            max_delay_seconds,
        }
    }

    /// Strategy in effect. An unset strategy behaves as fixed.
    pub fn strategy(&self) -> BackoffStrategy {
        self.backoff_strategy.unwrap_or(BackoffStrategy::Fixed)
    }

    /// Total attempts allowed, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let seconds = match self.strategy() {
            BackoffStrategy::Fixed => self.initial_delay_seconds,
            BackoffStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1).min(62) as i32;
                (self.initial_delay_seconds * 2f64.powi(exponent)).min(self.max_delay_seconds)
            }
        };
        Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
    }
}
