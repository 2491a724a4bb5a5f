//! The dispatch loop that threads one request through every stage.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wayfinder_config::AppConfig;
use wayfinder_core::context::{ContextSummary, PlanError, StoppedReason, TaskContext};
use wayfinder_core::event::{DomainEvent, EventBus};
use wayfinder_core::material::MaterialOracle;
use wayfinder_core::plan::PlanStep;
use wayfinder_core::provider::Provider;
use wayfinder_core::tool::{ToolInvocation, ToolRegistry, ToolResult};

use crate::classifier::IntentClassifier;
use crate::governor::{LoopDirective, ReflectionGovernor};
use crate::planner::PlanBuilder;

/// How a request left the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub stopped_reason: Option<StoppedReason>,
    pub plan_error: Option<PlanError>,
    pub summary: ContextSummary,
}

/// Classify → plan → (dispatch → reflect)* for a single request.
pub struct Pipeline {
    classifier: IntentClassifier,
    planner: PlanBuilder,
    governor: ReflectionGovernor,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
}

impl Pipeline {
    pub fn new(
        classifier: IntentClassifier,
        planner: PlanBuilder,
        governor: ReflectionGovernor,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            classifier,
            planner,
            governor,
            tools,
            event_bus,
        }
    }

    /// Wire every stage from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        oracle: Arc<dyn MaterialOracle>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let classifier = IntentClassifier::new(provider, config.default_model.clone())
            .with_settings(config.classifier.clone());
        Self::new(
            classifier,
            PlanBuilder::new(oracle),
            ReflectionGovernor::new(config.governor.clone()),
            tools,
            event_bus,
        )
    }

    pub fn governor(&self) -> &ReflectionGovernor {
        &self.governor
    }

    /// Run the request to completion.
    ///
    /// Always terminates: the governor's ceilings bound the number of
    /// dispatches, and a plan error ends the run before any tool is called.
    pub async fn run(&self, ctx: &mut TaskContext) -> PipelineOutcome {
        let classification = self.classifier.classify(ctx).await;
        self.event_bus.publish(DomainEvent::IntentClassified {
            session_id: ctx.session_id.clone(),
            intent: classification.intent,
            confidence: classification.confidence,
            escalated: classification.escalated,
            timestamp: Utc::now(),
        });

        self.planner.build(ctx).await;
        self.event_bus.publish(DomainEvent::PlanBuilt {
            session_id: ctx.session_id.clone(),
            steps: ctx.plan.iter().map(|s| s.tool.clone()).collect(),
            plan_error: ctx.plan_error,
            timestamp: Utc::now(),
        });

        if ctx.plan_error.is_some() {
            return self.finish(ctx);
        }

        loop {
            self.skip_gated_steps(ctx);

            if let Some(step) = ctx.current_plan_step().cloned() {
                let result = self.dispatch(ctx, &step).await;
                ctx.current_step += 1;
                ctx.record_result(result);
            }

            let reflection = self.governor.reflect(ctx);
            self.event_bus.publish(DomainEvent::ReflectionCompleted {
                session_id: ctx.session_id.clone(),
                iteration: ctx.iterations,
                outcome: reflection.label().to_string(),
                timestamp: Utc::now(),
            });

            if self.governor.should_continue(ctx) == LoopDirective::Respond {
                break;
            }
        }

        self.finish(ctx)
    }

    /// Advance past conditional steps whose gate is closed.
    fn skip_gated_steps(&self, ctx: &mut TaskContext) {
        while let Some(step) = ctx.current_plan_step() {
            if step.should_run(ctx.upstream_output(&step.tool)) {
                return;
            }
            debug!(
                session_id = %ctx.session_id,
                tool = %step.tool,
                step = ctx.current_step,
                "Skipping conditional step, previous step produced output"
            );
            ctx.current_step += 1;
        }
    }

    async fn dispatch(&self, ctx: &TaskContext, step: &PlanStep) -> ToolResult {
        let previous_output = if step.consumes_previous_output {
            ctx.upstream_output(&step.tool).map(str::to_string)
        } else {
            None
        };

        let invocation = ToolInvocation {
            user_message: ctx.user_message.clone(),
            notebook_id: ctx.notebook_id.clone(),
            user_id: ctx.user_id.clone(),
            session_id: ctx.session_id.clone(),
            material_ids: ctx.material_ids.clone(),
            history: ctx.history.clone(),
            step_description: step.description.clone(),
            previous_output,
        };

        debug!(
            session_id = %ctx.session_id,
            tool = %step.tool,
            step = ctx.current_step,
            "Dispatching plan step"
        );

        let started = Instant::now();
        let result = match self.tools.execute(&step.tool, invocation).await {
            Ok(result) => result,
            Err(e) => ToolResult::failed(step.tool.clone(), e.to_string()),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        self.event_bus.publish(DomainEvent::ToolExecuted {
            session_id: ctx.session_id.clone(),
            tool_name: step.tool.clone(),
            success: result.success,
            duration_ms,
            tokens_used: result.tokens_used,
            timestamp: Utc::now(),
        });

        result
    }

    fn finish(&self, ctx: &TaskContext) -> PipelineOutcome {
        self.event_bus.publish(DomainEvent::PipelineFinished {
            session_id: ctx.session_id.clone(),
            stopped_reason: ctx.stopped_reason,
            plan_error: ctx.plan_error,
            tool_calls: ctx.total_tool_calls,
            tokens: ctx.total_tokens,
            timestamp: Utc::now(),
        });

        info!(
            session_id = %ctx.session_id,
            stopped_reason = ctx.stopped_reason.map(|r| r.as_str()).unwrap_or("none"),
            plan_error = ctx.plan_error.map(|e| e.as_str()).unwrap_or("none"),
            iterations = ctx.iterations,
            tool_calls = ctx.total_tool_calls,
            tokens = ctx.total_tokens,
            "Pipeline finished"
        );

        PipelineOutcome {
            stopped_reason: ctx.stopped_reason,
            plan_error: ctx.plan_error,
            summary: ctx.summary(),
        }
    }
}
