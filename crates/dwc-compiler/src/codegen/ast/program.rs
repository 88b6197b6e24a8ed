// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Program assembly for AST-based code generation.
//!
//! Generates the `main.rs` of a workflow binary: constants, the
//! `workflow_plan()` builder chain and an async `main` that hands the plan
//! to the dwc-runtime engine.

use dwc_ir::{BackoffStrategy, DEFAULT_TIMEOUT_SECONDS, Predicate, RetryPolicy, StepKind, WorkflowSpec};
use proc_macro2::TokenStream;
use quote::quote;

use super::context::{EmitContext, doc_extensions};
use crate::codegen::CodegenError;
use crate::dependency_resolver;

/// An ordered list of named token sections.
#[derive(Debug, Clone, Default)]
pub struct EmittedProgram {
    sections: Vec<(&'static str, TokenStream)>,
}

impl EmittedProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, tokens: TokenStream) {
        self.sections.push((name, tokens));
    }

    pub fn section(&self, name: &str) -> Option<&TokenStream> {
        self.sections
            .iter()
            .find(|(section, _)| *section == name)
            .map(|(_, tokens)| tokens)
    }

    pub fn section_names(&self) -> Vec<&'static str> {
        self.sections.iter().map(|(name, _)| *name).collect()
    }

    /// Render every section after a comment banner carrying its name.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, tokens) in &self.sections {
            out.push_str(&format!("// ==== {name} ====\n"));
            out.push_str(&tokens.to_string());
            out.push_str("\n\n");
        }
        out
    }
}

/// Emit the complete program.
pub fn emit_program(spec: &WorkflowSpec, ctx: &EmitContext) -> Result<EmittedProgram, CodegenError> {
    let mut program = EmittedProgram::new();
    program.push("header", emit_header(spec));
    program.push("imports", emit_imports());
    program.push("constants", emit_constants(spec, ctx));
    program.push("workflow_plan", emit_workflow_plan(spec)?);
    program.push("main", emit_main());
    Ok(program)
}

fn emit_header(spec: &WorkflowSpec) -> TokenStream {
    let doc = format!(" Generated workflow program for `{}` ({}).", spec.name, spec.version);
    quote! {
        #![doc = #doc]
        #![allow(dead_code)]
    }
}

fn emit_imports() -> TokenStream {
    quote! {
        mod tools;

        use std::process::ExitCode;
        use std::sync::Arc;

        // prelude includes: plan builders, engine, executor, RunArgs, serde_json
        use dwc_runtime::prelude::*;
    }
}

/// Step order recorded by dependency resolution, recomputed when absent.
fn step_order(spec: &WorkflowSpec) -> Vec<String> {
    let recorded: Option<Vec<String>> = spec
        .metadata
        .get("dependency")
        .and_then(|d| d.get("topological_order"))
        .and_then(|order| serde_json::from_value(order.clone()).ok());

    recorded
        .filter(|order: &Vec<String>| order.len() == spec.steps.len())
        .or_else(|| dependency_resolver::topological_order(spec).ok())
        .unwrap_or_else(|| spec.steps.iter().map(|s| s.id.clone()).collect())
}

fn emit_constants(spec: &WorkflowSpec, ctx: &EmitContext) -> TokenStream {
    let name = &spec.name;
    let version = &spec.version;
    let synthesis_prompt = &ctx.synthesis_prompt;
    let approved_plan = &ctx.approved_plan;
    let intent_summary = &ctx.intent_summary;
    let current_task = &ctx.current_task_description;
    let document_required = ctx.document_required;
    let extensions = doc_extensions(ctx.document_required);
    let order = step_order(spec);
    let roots = dependency_resolver::roots(spec);

    quote! {
        const WORKFLOW_NAME: &str = #name;
        const WORKFLOW_VERSION: &str = #version;
        const SYNTHESIS_PROMPT: &str = #synthesis_prompt;
        const APPROVED_PLAN: &str = #approved_plan;
        const INTENT_SUMMARY: &str = #intent_summary;
        const CURRENT_TASK_DESCRIPTION: &str = #current_task;
        /// Whether the workflow refuses to run without a document.
        const DOCUMENT_REQUIRED: bool = #document_required;
        const SUPPORTED_DOC_EXTENSIONS: &[&str] = &[#(#extensions),*];
        /// Topological order of the optimized graph.
        const STEP_ORDER: &[&str] = &[#(#order),*];
        const ROOT_STEPS: &[&str] = &[#(#roots),*];
    }
}

fn kind_tokens(kind: StepKind) -> TokenStream {
    match kind {
        StepKind::Tool => quote! { StepKind::Tool },
        StepKind::Llm => quote! { StepKind::Llm },
        StepKind::Condition => quote! { StepKind::Condition },
        StepKind::Transform => quote! { StepKind::Transform },
    }
}

fn predicate_tokens(predicate: Predicate) -> TokenStream {
    match predicate {
        Predicate::Always => quote! { Predicate::Always },
        Predicate::StepSucceeded => quote! { Predicate::StepSucceeded },
        Predicate::StepFailed => quote! { Predicate::StepFailed },
    }
}

fn retry_tokens(policy: &RetryPolicy) -> TokenStream {
    let max_retries = policy.max_retries;
    let initial = policy.initial_delay_seconds;
    let max_delay = policy.max_delay_seconds;
    let strategy = match policy.backoff_strategy {
        Some(BackoffStrategy::Fixed) => quote! { Some(BackoffStrategy::Fixed) },
        Some(BackoffStrategy::Exponential) => quote! { Some(BackoffStrategy::Exponential) },
        None => quote! { None },
    };
    quote! {
        RetryPolicy {
            max_retries: #max_retries,
            backoff_strategy: #strategy,
            initial_delay_seconds: #initial,
            max_delay_seconds: #max_delay,
        }
    }
}

fn emit_workflow_plan(spec: &WorkflowSpec) -> Result<TokenStream, CodegenError> {
    let mut steps = Vec::with_capacity(spec.steps.len());
    for step in &spec.steps {
        let id = &step.id;
        let kind = kind_tokens(step.kind);
        let retry = retry_tokens(&step.retry_policy);
        let timeout = u64::try_from(step.timeout_seconds)
            .ok()
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS as u64);

        // Config is embedded as JSON text and parsed when the plan is built.
        let config = if step.config.is_empty() {
            quote! {}
        } else {
            let json = serde_json::to_string(&step.config).map_err(|source| {
                CodegenError::Serialize {
                    what: "step config",
                    source,
                }
            })?;
            quote! { .config(json_object(#json)) }
        };

        steps.push(quote! {
            .step(
                StepPlan::new(#id, #kind)
                    #config
                    .retry(#retry)
                    .timeout_seconds(#timeout)
            )
        });
    }

    let edges = spec.edges.iter().map(|edge| {
        let source = &edge.source;
        let target = &edge.target;
        match edge.condition {
            Some(predicate) => {
                let predicate = predicate_tokens(predicate);
                quote! { .edge(EdgePlan::new(#source, #target).when(#predicate)) }
            }
            None => quote! { .edge(EdgePlan::new(#source, #target)) },
        }
    });

    let outputs = spec.outputs.iter().map(|output| {
        let id = &output.id;
        let name = &output.name;
        let source = match output.source_step.as_deref().filter(|s| !s.is_empty()) {
            Some(source) => quote! { Some(#source) },
            None => quote! { None },
        };
        quote! { .output(OutputBinding::new(#id, #name, #source)) }
    });

    Ok(quote! {
        /// The optimized workflow graph.
        fn workflow_plan() -> WorkflowPlan {
            WorkflowPlan::new(WORKFLOW_NAME, WORKFLOW_VERSION)
                #(#steps)*
                #(#edges)*
                #(#outputs)*
                .order(STEP_ORDER)
                .context(PlanContext {
                    synthesis_prompt: SYNTHESIS_PROMPT.to_string(),
                    approved_plan: APPROVED_PLAN.to_string(),
                    intent_summary: INTENT_SUMMARY.to_string(),
                    current_task_description: CURRENT_TASK_DESCRIPTION.to_string(),
                })
        }
    })
}

fn emit_main() -> TokenStream {
    quote! {
        /// Load input, run the engine and return the final answer.
        async fn run_workflow(args: RunArgs) -> dwc_runtime::error::Result<String> {
            let input = build_input(&args, DOCUMENT_REQUIRED, SUPPORTED_DOC_EXTENSIONS).await?;
            let config = RuntimeConfig::from_env()?;
            let executor = DefaultExecutor::from_config(tools::registry(), &config);

            dwc_runtime::tracing::debug!(
                workflow = WORKFLOW_NAME,
                roots = ?ROOT_STEPS,
                "Starting workflow"
            );

            let outcome = Engine::new(workflow_plan(), Arc::new(executor))
                .with_max_workers(config.max_workers)
                .run(input)
                .await;
            Ok(outcome.final_answer)
        }

        #[tokio::main]
        async fn main() -> ExitCode {
            load_dotenv();
            init_subscriber();

            let args = RunArgs::from_cli();
            match run_workflow(args).await {
                Ok(answer) => {
                    println!("{}", answer);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
