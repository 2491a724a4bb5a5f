//! The task context: the single mutable record threaded through every stage.
//!
//! One context exists per user request. The dispatch loop owns it and lends
//! it by `&mut` to the classifier, the plan builder and the governor in turn.
//! It flows forward only. The one exception is the governor stepping
//! `current_step` back by one to retry a failed step.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::message::Message;
use crate::plan::PlanStep;
use crate::tool::ToolResult;

/// Why the control loop stopped. Set exactly once, on the terminating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedReason {
    MaxIterations,
    MaxToolCalls,
    TokenBudget,
    PlanComplete,
}

impl StoppedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxIterations => "max_iterations",
            Self::MaxToolCalls => "max_tool_calls",
            Self::TokenBudget => "token_budget",
            Self::PlanComplete => "plan_complete",
        }
    }

    /// Whether the loop was cut short by a budget rather than finishing.
    pub fn is_budget_exhaustion(&self) -> bool {
        !matches!(self, Self::PlanComplete)
    }
}

impl std::fmt::Display for StoppedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal, non-retryable planning failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanError {
    /// The request referenced materials but none are fully processed.
    NoCompletedMaterials,
}

impl PlanError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCompletedMaterials => "no_completed_materials",
        }
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request state shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    // ── Inputs ──
    pub user_message: String,
    pub notebook_id: String,
    pub user_id: String,
    pub session_id: String,

    /// Narrowed to fully processed materials by the plan builder
    #[serde(default)]
    pub material_ids: Vec<String>,

    /// Conversation history supplied by the caller for this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,

    // ── Classification ──
    #[serde(default)]
    pub intent: Option<Intent>,

    #[serde(default)]
    pub intent_confidence: f32,

    /// Forces classification, with confidence 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_override: Option<Intent>,

    // ── Planning ──
    #[serde(default)]
    pub plan: Vec<PlanStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_error: Option<PlanError>,

    /// Index of the next step to dispatch
    #[serde(default)]
    pub current_step: usize,

    /// Retries spent on the current step only
    #[serde(default)]
    pub step_retries: u32,

    // ── Budgets (monotonically non-decreasing) ──
    #[serde(default)]
    pub iterations: u32,

    #[serde(default)]
    pub total_tool_calls: u32,

    #[serde(default)]
    pub total_tokens: u64,

    // ── Execution ──
    /// Append-only, in execution order
    #[serde(default)]
    pub tool_results: Vec<ToolResult>,

    /// The governor's directive: loop again
    #[serde(default)]
    pub needs_retry: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<StoppedReason>,
}

impl TaskContext {
    /// Seed a context with the immutable request inputs.
    pub fn new(
        user_message: impl Into<String>,
        notebook_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            notebook_id: notebook_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            material_ids: Vec::new(),
            history: Vec::new(),
            intent: None,
            intent_confidence: 0.0,
            intent_override: None,
            plan: Vec::new(),
            plan_error: None,
            current_step: 0,
            step_retries: 0,
            iterations: 0,
            total_tool_calls: 0,
            total_tokens: 0,
            tool_results: Vec::new(),
            needs_retry: false,
            stopped_reason: None,
        }
    }

    pub fn with_materials<I, S>(mut self, material_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.material_ids = material_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Force the intent; classification will not run.
    pub fn with_intent_override(mut self, intent: Intent) -> Self {
        self.intent_override = Some(intent);
        self
    }

    /// Pre-set the intent. With `confidence >= 1.0` the classifier leaves it alone.
    pub fn with_intent(mut self, intent: Intent, confidence: f32) -> Self {
        self.intent = Some(intent);
        self.intent_confidence = confidence;
        self
    }

    /// Pre-seed the plan; the plan builder will not replace it.
    pub fn with_plan(mut self, plan: Vec<PlanStep>) -> Self {
        self.plan = plan;
        self
    }

    /// Append a tool result and charge it against the tool-call and token budgets.
    pub fn record_result(&mut self, result: ToolResult) {
        self.total_tool_calls = self.total_tool_calls.saturating_add(1);
        self.total_tokens = self.total_tokens.saturating_add(u64::from(result.tokens_used));
        self.tool_results.push(result);
    }

    pub fn last_result(&self) -> Option<&ToolResult> {
        self.tool_results.last()
    }

    /// Output handed to a step of `tool`: the latest result, ignoring the
    /// failed attempts of `tool` itself that a retry left behind.
    pub fn upstream_output(&self, tool: &str) -> Option<&str> {
        self.tool_results
            .iter()
            .rev()
            .find(|r| r.success || r.tool != tool)
            .map(|r| r.output.as_str())
    }

    /// Whether any result in the audit trail came from `tool`.
    pub fn has_used_tool(&self, tool: &str) -> bool {
        self.tool_results.iter().any(|r| r.tool == tool)
    }

    pub fn current_plan_step(&self) -> Option<&PlanStep> {
        self.plan.get(self.current_step)
    }

    pub fn remaining_steps(&self) -> usize {
        self.plan.len().saturating_sub(self.current_step)
    }

    /// Whether no further dispatch is allowed.
    pub fn is_terminal(&self) -> bool {
        self.stopped_reason.is_some() || self.plan_error.is_some()
    }

    /// A compact snapshot for logs and the final-response stage.
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            session_id: self.session_id.clone(),
            intent: self.intent,
            intent_confidence: self.intent_confidence,
            current_step: self.current_step,
            plan_len: self.plan.len(),
            iterations: self.iterations,
            total_tool_calls: self.total_tool_calls,
            total_tokens: self.total_tokens,
            stopped_reason: self.stopped_reason,
            plan_error: self.plan_error,
            results: self.tool_results.iter().map(ResultLine::from_result).collect(),
        }
    }
}

/// Width each result preview is truncated to.
const PREVIEW_CHARS: usize = 120;

/// One-line digest of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLine {
    pub tool: String,
    pub success: bool,
    pub preview: String,
}

impl ResultLine {
    fn from_result(result: &ToolResult) -> Self {
        let source = match (&result.summary, &result.error) {
            (Some(summary), _) => summary.as_str(),
            (None, Some(error)) if !result.success => error.as_str(),
            _ => result.output.as_str(),
        };
        Self {
            tool: result.tool.clone(),
            success: result.success,
            preview: truncate_chars(source.trim(), PREVIEW_CHARS),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Snapshot returned by [`TaskContext::summary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub session_id: String,
    pub intent: Option<Intent>,
    pub intent_confidence: f32,
    pub current_step: usize,
    pub plan_len: usize,
    pub iterations: u32,
    pub total_tool_calls: u32,
    pub total_tokens: u64,
    pub stopped_reason: Option<StoppedReason>,
    pub plan_error: Option<PlanError>,
    pub results: Vec<ResultLine>,
}

impl std::fmt::Display for ContextSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let intent = self.intent.map(|i| i.label()).unwrap_or("UNCLASSIFIED");
        writeln!(
            f,
            "session={} intent={} ({:.2}) step={}/{} iterations={} tool_calls={} tokens={}",
            self.session_id,
            intent,
            self.intent_confidence,
            self.current_step,
            self.plan_len,
            self.iterations,
            self.total_tool_calls,
            self.total_tokens,
        )?;
        if let Some(err) = self.plan_error {
            writeln!(f, "plan_error={err}")?;
        }
        if let Some(reason) = self.stopped_reason {
            writeln!(f, "stopped={reason}")?;
        }
        for (i, line) in self.results.iter().enumerate() {
            let mark = if line.success { "ok" } else { "failed" };
            writeln!(f, "{}. [{}] {}: {}", i + 1, mark, line.tool, line.preview)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::names;

    fn ctx() -> TaskContext {
        TaskContext::new("what is osmosis", "nb-1", "u-1", "s-1")
    }

    #[test]
    fn new_context_starts_clean() {
        let c = ctx();
        assert!(c.intent.is_none());
        assert!(c.plan.is_empty());
        assert_eq!(c.current_step, 0);
        assert!(!c.needs_retry);
        assert!(!c.is_terminal());
    }

    #[test]
    fn record_result_charges_budgets() {
        let mut c = ctx();
        c.record_result(ToolResult::ok(names::RAG, "a").with_tokens(400));
        c.record_result(ToolResult::failed(names::RESEARCH, "boom").with_tokens(100));
        assert_eq!(c.total_tool_calls, 2);
        assert_eq!(c.total_tokens, 500);
        assert_eq!(c.last_result().unwrap().tool, names::RESEARCH);
        assert!(c.has_used_tool(names::RAG));
        assert!(!c.has_used_tool(names::PYTHON));
    }

    #[test]
    fn remaining_steps_never_underflows() {
        let mut c = ctx().with_plan(vec![PlanStep::new(names::RAG, "Retrieve")]);
        assert_eq!(c.remaining_steps(), 1);
        c.current_step = 3;
        assert_eq!(c.remaining_steps(), 0);
        assert!(c.current_plan_step().is_none());
    }

    #[test]
    fn markers_serialize_snake_case() {
        let mut c = ctx();
        c.plan_error = Some(PlanError::NoCompletedMaterials);
        c.stopped_reason = Some(StoppedReason::TokenBudget);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["plan_error"], "no_completed_materials");
        assert_eq!(json["stopped_reason"], "token_budget");
    }

    #[test]
    fn summary_prefers_tool_summary_and_truncates() {
        let mut c = ctx().with_intent(Intent::Question, 0.7);
        c.record_result(ToolResult::ok(names::RAG, "long output").with_summary("short"));
        c.record_result(ToolResult::ok(names::RESEARCH, "x".repeat(500)));
        c.record_result(ToolResult::failed(names::PYTHON, "sandbox crashed"));

        let summary = c.summary();
        assert_eq!(summary.results[0].preview, "short");
        assert_eq!(summary.results[1].preview.chars().count(), PREVIEW_CHARS + 1);
        assert_eq!(summary.results[2].preview, "sandbox crashed");

        let text = summary.to_string();
        assert!(text.contains("intent=QUESTION"));
        assert!(text.contains("[failed] python_tool"));
    }

    #[test]
    fn upstream_output_skips_own_failed_attempts() {
        let mut c = ctx();
        assert_eq!(c.upstream_output(names::PYTHON), None);

        c.record_result(ToolResult::ok(names::RAG, "jan=3 feb=5"));
        c.record_result(ToolResult::failed(names::PYTHON, "kernel died"));
        c.record_result(ToolResult::failed(names::PYTHON, "kernel died"));
        assert_eq!(c.upstream_output(names::PYTHON), Some("jan=3 feb=5"));

        // Another tool's failure is still the latest upstream result
        assert_eq!(c.upstream_output(names::QUIZ), c.last_result().map(|r| r.output.as_str()));
    }

    #[test]
    fn budget_exhaustion_classification() {
        assert!(StoppedReason::MaxIterations.is_budget_exhaustion());
        assert!(StoppedReason::TokenBudget.is_budget_exhaustion());
        assert!(!StoppedReason::PlanComplete.is_budget_exhaustion());
    }
}
