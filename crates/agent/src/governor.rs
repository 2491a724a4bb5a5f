//! The reflection governor: the control loop's brain.
//!
//! Called once after every dispatched step. Each cycle checks the three hard
//! ceilings first, then judges the latest tool result:
//!
//! 1. iterations (incremented here) ≥ `max_iterations` → stop
//! 2. tool calls ≥ `max_tool_calls` → stop
//! 3. tokens ≥ `token_budget` → stop
//! 4. a failed result is retried up to `max_step_retries` times, then abandoned;
//!    a weak QUESTION answer gets one web-research fallback step appended,
//!    unless a research step still ahead in the plan is about to run
//! 5. steps remain → continue, otherwise stop with `plan_complete`
//!
//! Nothing here returns an error. Every exit is either a directive to loop
//! again or a recorded [`StoppedReason`].

use tracing::{debug, info, warn};
use wayfinder_core::context::{StoppedReason, TaskContext};
use wayfinder_core::intent::Intent;
use wayfinder_core::limits::GovernorLimits;
use wayfinder_core::plan::PlanStep;
use wayfinder_core::tool::names;

/// What one reflection cycle decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflection {
    /// Advance to the next planned step
    Continue,
    /// Re-run the step that just failed
    Retry,
    /// A research step was appended after a weak answer
    FallbackInjected,
    /// The loop is over
    Stop(StoppedReason),
}

impl Reflection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Retry => "retry",
            Self::FallbackInjected => "fallback",
            Self::Stop(_) => "stop",
        }
    }
}

/// The dispatch loop's branch after a reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDirective {
    /// Dispatch the step at `current_step`
    Continue,
    /// Exit to final-answer generation
    Respond,
}

impl LoopDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Respond => "respond",
        }
    }
}

/// Enforces budgets and decides retry / continue / fallback / stop.
pub struct ReflectionGovernor {
    limits: GovernorLimits,
}

impl ReflectionGovernor {
    pub fn new(limits: GovernorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &GovernorLimits {
        &self.limits
    }

    /// Run one reflection cycle against the context.
    pub fn reflect(&self, ctx: &mut TaskContext) -> Reflection {
        if let Some(reason) = ctx.stopped_reason {
            ctx.needs_retry = false;
            return Reflection::Stop(reason);
        }

        ctx.iterations = ctx.iterations.saturating_add(1);

        if ctx.iterations >= self.limits.max_iterations {
            return Self::stop(ctx, StoppedReason::MaxIterations);
        }
        if ctx.total_tool_calls >= self.limits.max_tool_calls {
            return Self::stop(ctx, StoppedReason::MaxToolCalls);
        }
        if ctx.total_tokens >= self.limits.token_budget {
            return Self::stop(ctx, StoppedReason::TokenBudget);
        }

        let last = ctx
            .last_result()
            .map(|r| (r.success, r.trimmed_len(), r.tool.clone(), r.output.clone()));

        if let Some((success, output_len, tool, output)) = last {
            if !success {
                ctx.step_retries = ctx.step_retries.saturating_add(1);
                if ctx.step_retries <= self.limits.max_step_retries {
                    ctx.needs_retry = true;
                    ctx.current_step = ctx.current_step.saturating_sub(1);
                    warn!(
                        session_id = %ctx.session_id,
                        tool = %tool,
                        attempt = ctx.step_retries,
                        "Tool failed, retrying step"
                    );
                    return Reflection::Retry;
                }
                warn!(
                    session_id = %ctx.session_id,
                    tool = %tool,
                    retries = ctx.step_retries - 1,
                    "Tool failed after all retries, abandoning step"
                );
            } else if ctx.intent == Some(Intent::Question)
                && output_len < self.limits.min_useful_output_len
                && !ctx.has_used_tool(names::RESEARCH)
                && !Self::research_pending(ctx, &output)
            {
                ctx.plan.push(PlanStep::new(
                    names::RESEARCH,
                    "Search the web because the materials gave a thin answer",
                ));
                ctx.needs_retry = true;
                ctx.step_retries = 0;
                info!(
                    session_id = %ctx.session_id,
                    output_len,
                    "Weak answer, injected research fallback"
                );
                return Reflection::FallbackInjected;
            }
        }

        if ctx.current_step < ctx.plan.len() {
            ctx.needs_retry = true;
            ctx.step_retries = 0;
            debug!(
                session_id = %ctx.session_id,
                next_step = ctx.current_step,
                plan_len = ctx.plan.len(),
                "Continuing to next step"
            );
            return Reflection::Continue;
        }

        Self::stop(ctx, StoppedReason::PlanComplete)
    }

    /// Branch for the dispatch loop.
    ///
    /// Re-checks the iteration and token ceilings so a caller that skipped
    /// `reflect` still cannot overrun them.
    pub fn should_continue(&self, ctx: &TaskContext) -> LoopDirective {
        if ctx.needs_retry
            && ctx.iterations < self.limits.max_iterations
            && ctx.total_tokens < self.limits.token_budget
        {
            LoopDirective::Continue
        } else {
            LoopDirective::Respond
        }
    }

    /// Whether a research step still ahead in the plan is going to run,
    /// given the latest output as the gate input for the next step.
    fn research_pending(ctx: &TaskContext, last_output: &str) -> bool {
        ctx.plan
            .iter()
            .skip(ctx.current_step)
            .any(|step| step.tool == names::RESEARCH && step.should_run(Some(last_output)))
    }

    fn stop(ctx: &mut TaskContext, reason: StoppedReason) -> Reflection {
        ctx.needs_retry = false;
        ctx.stopped_reason = Some(reason);
        info!(
            session_id = %ctx.session_id,
            reason = %reason,
            iterations = ctx.iterations,
            tool_calls = ctx.total_tool_calls,
            tokens = ctx.total_tokens,
            "Control loop stopped"
        );
        Reflection::Stop(reason)
    }
}

impl Default for ReflectionGovernor {
    fn default() -> Self {
        Self::new(GovernorLimits::default())
    }
}
