// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Timeouts, retries and backoff around a single step.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::StepError;
use crate::executor::{StepContext, StepExecutor};
use crate::plan::StepPlan;
use crate::result::StepResult;

/// Run a step until it succeeds or its retry policy is exhausted.
///
/// Each attempt is bounded by the step timeout; a timeout counts as a failed
/// attempt. Between attempts the task sleeps for the policy's backoff delay.
/// Attempts never overlap. Never fails: an exhausted step yields an `error`
/// result carrying the last failure message.
pub async fn run_with_policy(
    executor: &dyn StepExecutor,
    step: &StepPlan,
    ctx: &StepContext,
) -> StepResult {
    let attempts = step.retry.total_attempts();
    let mut last_error = String::from("Step failed.");

    for attempt in 1..=attempts {
        let started = Instant::now();
        let failure = match tokio::time::timeout(step.timeout(), executor.execute(step, ctx)).await
        {
            Ok(Ok(result)) => {
                info!(
                    step_id = %step.id,
                    attempt,
                    status = %result.status,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "step_complete"
                );
                return result.sanitized(&step.id);
            }
            Ok(Err(err)) => err,
            Err(_) => StepError::Timeout {
                step_id: step.id.clone(),
                timeout_seconds: step.timeout().as_secs(),
                attempt,
                attempts,
            },
        };

        last_error = failure.to_string();
        if !failure.is_retryable() {
            warn!(step_id = %step.id, attempt, error = %last_error, "Step failed permanently");
            break;
        }

        if attempt < attempts {
            let delay = step.retry.delay_for_attempt(attempt);
            warn!(
                step_id = %step.id,
                attempt,
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "step_retry"
            );
            tokio::time::sleep(delay).await;
        }
    }

    error!(step_id = %step.id, attempts, error = %last_error, "step_error");
    StepResult::error(&step.id, last_error)
}
