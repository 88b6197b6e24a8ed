// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end engine runs against hand-built plans.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dwc_runtime::prelude::*;
use dwc_runtime::result::{STATUS_ERROR, STATUS_OK};

static ALWAYS_FAILS_CALLS: AtomicU32 = AtomicU32::new(0);

fn always_fails(_: &TaskInput) -> Result<StepResult, ToolError> {
    ALWAYS_FAILS_CALLS.fetch_add(1, Ordering::SeqCst);
    Err(ToolError::new("service unavailable"))
}

fn lookup(input: &TaskInput) -> Result<StepResult, ToolError> {
    Ok(StepResult::ok("lookup", format!("found {}", input_text(input))))
}

fn broken(_: &TaskInput) -> Result<StepResult, ToolError> {
    Ok(StepResult::error("broken", "upstream said no"))
}

fn registry() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools
        .register("always_fails", always_fails)
        .register("lookup", lookup)
        .register("broken", broken);
    tools
}

fn tool_step(id: &str, tool: &str) -> StepPlan {
    StepPlan::new(id, StepKind::Tool)
        .config(json_object(&json!({ "tool_name": tool }).to_string()))
        .retry(RetryPolicy::fixed(1, 1.0))
        .timeout_seconds(30)
}

fn query(text: &str) -> TaskInput {
    let mut input = TaskInput::new();
    input.insert("query".into(), json!(text));
    input
}

fn engine(plan: WorkflowPlan) -> Engine {
    Engine::new(plan, Arc::new(DefaultExecutor::new(registry())))
}

#[tokio::test(start_paused = true)]
async fn test_failing_tool_is_attempted_three_times() {
    let step = StepPlan::new("flaky", StepKind::Tool)
        .config(json_object(r#"{"tool_name": "always_fails"}"#))
        .retry(RetryPolicy::fixed(2, 1.0))
        .timeout_seconds(30);
    let plan = WorkflowPlan::new("retry", "1.0.0").step(step);
    let started = tokio::time::Instant::now();

    let outcome = engine(plan).run(query("x")).await;

    assert_eq!(ALWAYS_FAILS_CALLS.load(Ordering::SeqCst), 3);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3),
        "backoff took {elapsed:?}"
    );
    let result = &outcome.results["flaky"];
    assert_eq!(result.status, STATUS_ERROR);
    assert_eq!(result.result, "service unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_success_branch_skips_failure_branch() {
    let plan = WorkflowPlan::new("branch", "1.0.0")
        .step(tool_step("search", "lookup"))
        .step(
            StepPlan::new("report", StepKind::Transform)
                .config(json_object(r#"{"source_step": "search"}"#)),
        )
        .step(tool_step("recover", "lookup"))
        .edge(EdgePlan::new("search", "report").when(Predicate::StepSucceeded))
        .edge(EdgePlan::new("search", "recover").when(Predicate::StepFailed))
        .output(OutputBinding::new("answer", "answer", Some("report")))
        .order(&["search", "recover", "report"]);

    let outcome = engine(plan).run(query("rust")).await;

    assert_eq!(outcome.results["report"].result, "found rust");
    assert!(!outcome.results.contains_key("recover"));
    assert_eq!(outcome.skipped, vec!["recover"]);
    assert_eq!(outcome.final_answer, "found rust");
}

#[tokio::test(start_paused = true)]
async fn test_failure_branch_runs_on_error_status() {
    let plan = WorkflowPlan::new("branch", "1.0.0")
        .step(tool_step("fetch", "broken"))
        .step(tool_step("recover", "lookup"))
        .step(tool_step("publish", "lookup"))
        .edge(EdgePlan::new("fetch", "recover").when(Predicate::StepFailed))
        .edge(EdgePlan::new("fetch", "publish").when(Predicate::StepSucceeded))
        .output(OutputBinding::new("answer", "answer", Some("recover")));

    let outcome = engine(plan).run(query("retry")).await;

    assert_eq!(outcome.results["fetch"].status, STATUS_ERROR);
    assert_eq!(outcome.results["recover"].status, STATUS_OK);
    assert_eq!(outcome.skipped, vec!["publish"]);
    assert_eq!(outcome.final_answer, "found retry");
}

#[tokio::test(start_paused = true)]
async fn test_skips_propagate_downstream() {
    let plan = WorkflowPlan::new("chain", "1.0.0")
        .step(tool_step("a", "lookup"))
        .step(tool_step("b", "lookup"))
        .step(tool_step("c", "lookup"))
        .edge(EdgePlan::new("a", "b").when(Predicate::StepFailed))
        .edge(EdgePlan::new("b", "c"))
        .order(&["a", "b", "c"]);

    let outcome = engine(plan).run(query("q")).await;

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.skipped, vec!["b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_fan_in_sees_every_parent() {
    let plan = WorkflowPlan::new("fan_in", "1.0.0")
        .step(tool_step("a", "lookup"))
        .step(tool_step("b", "lookup"))
        .step(StepPlan::new("join", StepKind::Transform).config(json_object(
            r#"{"template": "{{ step_results.a.status }}+{{ step_results.b.status }}"}"#,
        )))
        .edge(EdgePlan::new("a", "join"))
        .edge(EdgePlan::new("b", "join"))
        .output(OutputBinding::new("answer", "answer", Some("join")));

    let outcome = engine(plan).run(query("q")).await;
    assert_eq!(outcome.final_answer, "ok+ok");
}

#[tokio::test(start_paused = true)]
async fn test_missing_tool_is_not_retried_and_answer_falls_back() {
    let step = StepPlan::new("fetch", StepKind::Tool)
        .config(json_object(r#"{"tool_name": "ghost", "subtask_description": "Fetch data"}"#))
        .retry(RetryPolicy::fixed(3, 5.0));
    let plan = WorkflowPlan::new("missing", "1.0.0")
        .step(step)
        .output(OutputBinding::new("answer", "answer", Some("fetch")));
    let started = tokio::time::Instant::now();

    let outcome = engine(plan).run(query("data")).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(outcome.results["fetch"].result, "Missing tool 'ghost'.");
    assert_eq!(
        outcome.final_answer,
        "Request: data\n- Fetch data: Missing tool 'ghost'."
    );
}

/// Records the highest number of steps running at once.
struct Gauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl StepExecutor for Gauge {
    async fn execute(&self, step: &StepPlan, _: &StepContext) -> Result<StepResult, StepError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(StepResult::ok(&step.id, "done"))
    }
}

async fn peak_concurrency(roots: usize, max_workers: Option<usize>) -> usize {
    let mut plan = WorkflowPlan::new("wide", "1.0.0");
    for i in 0..roots {
        plan = plan.step(StepPlan::new(format!("s{i}"), StepKind::Transform));
    }
    let gauge = Arc::new(Gauge {
        running: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let mut engine = Engine::new(plan, gauge.clone());
    if let Some(n) = max_workers {
        engine = engine.with_max_workers(n);
    }

    let outcome = engine.run(TaskInput::new()).await;
    assert_eq!(outcome.results.len(), roots);
    gauge.peak.load(Ordering::SeqCst)
}

#[tokio::test(start_paused = true)]
async fn test_worker_pool_is_bounded() {
    assert_eq!(peak_concurrency(6, None).await, 4);
    assert_eq!(peak_concurrency(6, Some(2)).await, 2);
    assert_eq!(peak_concurrency(3, None).await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_outputs_uses_sinks_then_fallback() {
    let plan = WorkflowPlan::new("sinks", "1.0.0")
        .step(tool_step("a", "lookup"))
        .step(tool_step("b", "broken"))
        .edge(EdgePlan::new("a", "b"));

    let outcome = engine(plan).run(query("q")).await;
    // The only sink failed, so the synthesized summary is returned.
    assert_eq!(
        outcome.final_answer,
        "Request: q\n- a: found q\n- b: upstream said no"
    );
}
