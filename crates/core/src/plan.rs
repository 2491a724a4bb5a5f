//! Plan steps: one planned invocation of a named tool.

use serde::{Deserialize, Serialize};

/// A predicate the dispatch loop evaluates before running a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCondition {
    /// Run only if the previous step's output was empty.
    RunIfPreviousEmpty,
}

/// One planned tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Tool identifier (see [`crate::tool::names`])
    pub tool: String,

    /// Human-readable description of what this step is for
    pub description: String,

    /// Optional gate evaluated by the dispatch loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,

    /// Whether this step receives the previous step's output
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub consumes_previous_output: bool,
}

impl PlanStep {
    pub fn new(tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            description: description.into(),
            condition: None,
            consumes_previous_output: false,
        }
    }

    /// Gate this step on the previous output being empty.
    pub fn only_if_previous_empty(mut self) -> Self {
        self.condition = Some(StepCondition::RunIfPreviousEmpty);
        self
    }

    /// Feed the previous step's output into this one.
    pub fn chained(mut self) -> Self {
        self.consumes_previous_output = true;
        self
    }

    /// Evaluate this step's condition against the previous step's output.
    ///
    /// Steps without a condition always run. With no previous output at all
    /// the previous output counts as empty.
    pub fn should_run(&self, previous_output: Option<&str>) -> bool {
        match self.condition {
            None => true,
            Some(StepCondition::RunIfPreviousEmpty) => {
                previous_output.is_none_or(|out| out.trim().is_empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_step_always_runs() {
        let step = PlanStep::new("rag_tool", "Retrieve");
        assert!(step.should_run(Some("plenty of output")));
        assert!(step.should_run(None));
    }

    #[test]
    fn conditional_step_skips_when_previous_has_output() {
        let step = PlanStep::new("research_tool", "Fallback").only_if_previous_empty();
        assert!(!step.should_run(Some("Paris is the capital.")));
        assert!(step.should_run(Some("   ")));
        assert!(step.should_run(None));
    }

    #[test]
    fn flags_are_omitted_from_json_when_unset() {
        let json = serde_json::to_string(&PlanStep::new("rag_tool", "Retrieve")).unwrap();
        assert!(!json.contains("condition"));
        assert!(!json.contains("consumes_previous_output"));

        let json = serde_json::to_string(
            &PlanStep::new("python_tool", "Analyze").chained(),
        )
        .unwrap();
        assert!(json.contains("\"consumes_previous_output\":true"));
    }
}
