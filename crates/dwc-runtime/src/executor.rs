// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Single-attempt step execution.
//!
//! A [`StepExecutor`] runs one attempt of one step. Timeouts, retries and
//! backoff are applied around it by [`crate::retry::run_with_policy`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dwc_ir::{Predicate, StepKind};
use serde_json::{Value, json};
use tracing::debug;

use crate::TaskInput;
use crate::config::RuntimeConfig;
use crate::error::StepError;
use crate::llm::{LlmClient, LlmRequest, OpenAiClient};
use crate::plan::{StepPlan, WorkflowPlan};
use crate::result::{STATUS_FALLBACK, STATUS_OK, STATUS_UNMATCHED, StepResult};
use crate::synthesis::fallback_synthesis;
use crate::tools::ToolRegistry;

/// What a step can see when it runs: the plan, the workflow input and the
/// results of every step that finished before it was dispatched.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub plan: Arc<WorkflowPlan>,
    pub input: Arc<TaskInput>,
    pub step_results: BTreeMap<String, StepResult>,
}

impl StepContext {
    pub fn new(
        plan: Arc<WorkflowPlan>,
        input: Arc<TaskInput>,
        step_results: BTreeMap<String, StepResult>,
    ) -> Self {
        Self {
            plan,
            input,
            step_results,
        }
    }

    /// The workflow input enriched with this step's context.
    pub fn task_input(&self, step: &StepPlan) -> TaskInput {
        let ctx = &self.plan.context;
        let mut input = (*self.input).clone();
        input.insert("step_id".into(), json!(step.id));
        input.insert("step_type".into(), json!(step.kind.to_string()));
        input.insert("step_config".into(), Value::Object(step.config.clone()));
        input.insert("subtask_id".into(), json!(step.id));
        input.insert("subtask_description".into(), json!(step.subtask_description()));
        input.insert(
            "current_task_description".into(),
            json!(ctx.current_task_description),
        );
        input.insert("intent_summary".into(), json!(ctx.intent_summary));
        input.insert("approved_plan".into(), json!(ctx.approved_plan));
        input.insert("prior_step_results".into(), self.results_json());
        input
    }

    pub fn fallback_answer(&self) -> String {
        fallback_synthesis(&self.plan, &self.input, &self.step_results)
    }

    fn results_json(&self) -> Value {
        serde_json::to_value(&self.step_results).unwrap_or_else(|_| json!({}))
    }
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run one attempt. `Ok` results are final even when their status is
    /// `error`; `Err` results are retried according to the step's policy.
    async fn execute(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError>;
}

/// Executor used by generated programs.
pub struct DefaultExecutor {
    tools: ToolRegistry,
    llm: Option<Arc<dyn LlmClient>>,
    default_model: String,
}

impl DefaultExecutor {
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            tools,
            llm: None,
            default_model: RuntimeConfig::default().llm_model,
        }
    }

    /// Executor with an OpenAI-compatible client when an endpoint is set.
    pub fn from_config(tools: ToolRegistry, config: &RuntimeConfig) -> Self {
        let mut executor = Self::new(tools).with_default_model(config.llm_model.clone());
        if let Some(client) = OpenAiClient::from_config(config) {
            executor = executor.with_llm(Arc::new(client));
        }
        executor
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(client);
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    async fn run_tool(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError> {
        let name = step.tool_name().to_string();
        let Some(tool) = self.tools.get(&name) else {
            return Ok(StepResult::error(&name, format!("Missing tool '{name}'.")));
        };

        let input = ctx.task_input(step);
        // The blocking task keeps running if the attempt times out.
        let outcome = tokio::task::spawn_blocking(move || tool(&input))
            .await
            .map_err(|e| StepError::Failed(format!("Tool '{name}' panicked: {e}")))?;
        Ok(outcome?.sanitized(&name))
    }

    async fn run_llm(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError> {
        let fallback = ctx.fallback_answer();
        let Some(client) = &self.llm else {
            return Ok(StepResult::new(
                &step.id,
                STATUS_FALLBACK,
                format!("{fallback}\n\n[llm unavailable: no LLM endpoint configured]"),
            ));
        };

        let request = LlmRequest {
            model: step
                .config_str("model")
                .unwrap_or(&self.default_model)
                .to_string(),
            prompt: build_prompt(step, ctx),
            temperature: step
                .config
                .get("temperature")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            max_tokens: step.config.get("max_output_tokens").and_then(Value::as_u64),
        };
        debug!(step_id = %step.id, model = %request.model, "Calling LLM");

        let answer = client
            .complete(&request)
            .await
            .map_err(|e| StepError::Failed(e.to_string()))?;
        let answer = answer.trim();
        Ok(StepResult::ok(
            &step.id,
            if answer.is_empty() { fallback.as_str() } else { answer },
        ))
    }

    fn run_transform(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError> {
        if let Some(template) = step.config_str("template") {
            let env = minijinja::Environment::new();
            let rendered = env
                .render_str(
                    template,
                    minijinja::context! {
                        input => &*ctx.input,
                        step_results => &ctx.step_results,
                    },
                )
                .map_err(|e| StepError::Fatal(format!("Template error in '{}': {e}", step.id)))?;
            return Ok(StepResult::ok(&step.id, rendered));
        }

        if let Some(source) = step.config_str("source_step") {
            let text = ctx
                .step_results
                .get(source)
                .map(|r| r.result.clone())
                .unwrap_or_default();
            return Ok(StepResult::ok(&step.id, text));
        }

        let text = serde_json::to_string(&*ctx.input)
            .map_err(|e| StepError::Fatal(e.to_string()))?;
        Ok(StepResult::ok(&step.id, text))
    }

    fn run_condition(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError> {
        let predicate = match step.config.get("predicate") {
            None | Some(Value::Null) => Predicate::Always,
            Some(value) => serde_json::from_value::<Predicate>(value.clone()).map_err(|_| {
                StepError::Fatal(format!(
                    "Condition step '{}' has an unknown predicate {value}",
                    step.id
                ))
            })?,
        };

        let source = step.config_str("source_step").map(str::to_string).or_else(|| {
            match ctx.plan.incoming(&step.id).as_slice() {
                [edge] => Some(edge.source.clone()),
                _ => None,
            }
        });
        let status = source
            .as_deref()
            .and_then(|s| ctx.step_results.get(s))
            .map(|r| r.status.as_str())
            .unwrap_or_default();

        let holds = predicate.evaluate(status);
        Ok(StepResult::new(
            &step.id,
            if holds { STATUS_OK } else { STATUS_UNMATCHED },
            holds.to_string(),
        ))
    }
}

#[async_trait]
impl StepExecutor for DefaultExecutor {
    async fn execute(&self, step: &StepPlan, ctx: &StepContext) -> Result<StepResult, StepError> {
        match step.kind {
            StepKind::Tool => self.run_tool(step, ctx).await,
            StepKind::Llm => self.run_llm(step, ctx).await,
            StepKind::Transform => self.run_transform(step, ctx),
            StepKind::Condition => self.run_condition(step, ctx),
        }
    }
}

/// Prompt sent for an LLM step: the step prompt (or the synthesis prompt)
/// followed by the run context.
pub fn build_prompt(step: &StepPlan, ctx: &StepContext) -> String {
    let plan_ctx = &ctx.plan.context;
    let template = step
        .config_str("prompt")
        .unwrap_or(&plan_ctx.synthesis_prompt);
    let input = serde_json::to_string(&*ctx.input).unwrap_or_default();
    let outputs = serde_json::to_string(&ctx.step_results).unwrap_or_default();

    format!(
        "{template}\n\nCurrent task:\n{}\n\nApproved plan:\n{}\n\nIntent summary:\n{}\n\nUser input:\n{input}\n\nStep outputs:\n{outputs}",
        plan_ctx.current_task_description, plan_ctx.approved_plan, plan_ctx.intent_summary,
    )
}
