// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wave-based workflow execution.
//!
//! The engine repeatedly collects every *ready* step, runs that wave on a
//! bounded worker pool, waits for the whole wave, then routes each finished
//! step's outgoing edges. A step is ready once all of its predecessors have
//! finished (or were skipped) and at least one incoming edge was activated.
//! Roots are ready immediately. Steps that can no longer be activated are
//! skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::TaskInput;
use crate::executor::{StepContext, StepExecutor};
use crate::plan::{StepPlan, WorkflowPlan};
use crate::result::{STATUS_ERROR, StepResult};
use crate::retry::run_with_policy;
use crate::routing::activated_targets;
use crate::synthesis::fallback_synthesis;

const DEFAULT_MAX_WORKERS: usize = 4;

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub results: BTreeMap<String, StepResult>,
    pub final_answer: String,
    /// Steps never dispatched because routing did not activate them.
    pub skipped: Vec<String>,
}

pub struct Engine {
    plan: Arc<WorkflowPlan>,
    executor: Arc<dyn StepExecutor>,
    max_workers: usize,
}

impl Engine {
    pub fn new(plan: WorkflowPlan, executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            plan: Arc::new(plan),
            executor,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn plan(&self) -> &WorkflowPlan {
        &self.plan
    }

    /// Execute the plan to completion. Step failures are recorded as
    /// `error` results and never abort the run.
    pub async fn run(&self, input: TaskInput) -> RunOutcome {
        let input = Arc::new(input);
        let results: Arc<DashMap<String, StepResult>> = Arc::new(DashMap::new());
        let mut finished: BTreeSet<String> = BTreeSet::new();
        let mut activated: BTreeSet<String> = BTreeSet::new();
        let mut skipped: Vec<String> = Vec::new();

        info!(workflow = %self.plan.name, steps = self.plan.steps.len(), "Workflow started");

        loop {
            let mut ready: Vec<&StepPlan> = Vec::new();
            let mut unreachable: Vec<&str> = Vec::new();

            for step in self.plan.ordered_steps() {
                if finished.contains(&step.id) {
                    continue;
                }
                let incoming = self.plan.incoming(&step.id);
                if !incoming.iter().all(|e| finished.contains(&e.source)) {
                    continue;
                }
                if incoming.is_empty() || activated.contains(&step.id) {
                    ready.push(step);
                } else {
                    unreachable.push(&step.id);
                }
            }

            for id in unreachable {
                info!(step_id = %id, "step_skipped");
                finished.insert(id.to_string());
                skipped.push(id.to_string());
            }

            if ready.is_empty() {
                if finished.len() >= self.plan.steps.len() {
                    break;
                }
                // A skip may have unblocked steps further down.
                if self.has_pending_decision(&finished) {
                    continue;
                }
                self.skip_remaining(&mut finished, &mut skipped);
                break;
            }

            self.run_wave(&ready, &input, &results).await;

            for step in &ready {
                let result = results
                    .get(&step.id)
                    .map(|r| r.value().clone())
                    .unwrap_or_else(|| StepResult::error(&step.id, "Step produced no result."));
                let outgoing = self.plan.outgoing(&step.id);
                activated.extend(
                    activated_targets(&outgoing, &result)
                        .into_iter()
                        .map(str::to_string),
                );
                finished.insert(step.id.clone());
            }
        }

        let results = snapshot(&results);
        let final_answer = self.final_answer(&input, &results);
        info!(
            workflow = %self.plan.name,
            completed = results.len(),
            skipped = skipped.len(),
            "Workflow finished"
        );

        RunOutcome {
            results,
            final_answer,
            skipped,
        }
    }

    async fn run_wave(
        &self,
        wave: &[&StepPlan],
        input: &Arc<TaskInput>,
        results: &Arc<DashMap<String, StepResult>>,
    ) {
        let ctx = Arc::new(StepContext::new(
            self.plan.clone(),
            input.clone(),
            snapshot(results),
        ));
        let semaphore = Arc::new(Semaphore::new(self.max_workers.min(wave.len()).max(1)));
        let mut tasks = JoinSet::new();

        for step in wave {
            let step = (*step).clone();
            let ctx = ctx.clone();
            let executor = self.executor.clone();
            let semaphore = semaphore.clone();
            let results = results.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(step_id = %step.id, "worker pool closed");
                        return;
                    }
                };
                info!(step_id = %step.id, kind = %step.kind, "step_start");
                let result = run_with_policy(&*executor, &step, &ctx).await;
                results.insert(step.id.clone(), result);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Step task aborted");
            }
        }

        for step in wave {
            if !results.contains_key(&step.id) {
                results.insert(
                    step.id.clone(),
                    StepResult::error(&step.id, "Step task aborted before completion."),
                );
            }
        }
    }

    fn has_pending_decision(&self, finished: &BTreeSet<String>) -> bool {
        self.plan.steps.iter().any(|step| {
            !finished.contains(&step.id)
                && self
                    .plan
                    .incoming(&step.id)
                    .iter()
                    .all(|e| finished.contains(&e.source))
        })
    }

    fn skip_remaining(&self, finished: &mut BTreeSet<String>, skipped: &mut Vec<String>) {
        for step in self.plan.ordered_steps() {
            if finished.insert(step.id.clone()) {
                warn!(step_id = %step.id, "step_skipped");
                skipped.push(step.id.clone());
            }
        }
    }

    /// First output-bound step with usable text, else the fallback
    /// synthesis. Without declared outputs the sinks are used.
    fn final_answer(&self, input: &TaskInput, results: &BTreeMap<String, StepResult>) -> String {
        let mut sources = self.plan.output_sources();
        if sources.is_empty() {
            sources = self
                .plan
                .ordered_steps()
                .into_iter()
                .filter(|s| self.plan.outgoing(&s.id).is_empty())
                .map(|s| s.id.as_str())
                .collect();
        }

        sources
            .iter()
            .filter_map(|id| results.get(*id))
            .filter(|r| r.status != STATUS_ERROR)
            .map(|r| r.result.trim())
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback_synthesis(&self.plan, input, results))
    }
}

fn snapshot(results: &DashMap<String, StepResult>) -> BTreeMap<String, StepResult> {
    results
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}
