//! Plan construction.
//!
//! Turns an intent into an ordered list of tool invocations. Intents that
//! read source materials first ask the readiness oracle which materials are
//! fully processed; if none are, planning fails terminally with
//! [`PlanError::NoCompletedMaterials`]. A readiness check that errors or
//! outlasts the timeout proceeds with every requested material.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use wayfinder_core::context::{PlanError, TaskContext};
use wayfinder_core::error::MaterialError;
use wayfinder_core::intent::Intent;
use wayfinder_core::material::MaterialOracle;
use wayfinder_core::plan::PlanStep;
use wayfinder_core::tool::names;

use crate::classifier::contains_term;

/// Keyword groups that pick the content-generation tool, checked in order.
const CONTENT_TOOLS: &[(&str, &[&str])] = &[
    (
        names::QUIZ,
        &["quiz", "quizzes", "test", "tests", "question", "questions", "mcq"],
    ),
    (names::FLASHCARD, &["flashcard", "flashcards", "card", "cards"]),
    (
        names::PPT,
        &["presentation", "presentations", "slides", "slide", "ppt", "deck"],
    ),
    (
        names::RAG,
        &["summary", "summaries", "notes", "study guide", "study-guide"],
    ),
];

/// How long the readiness oracle gets before planning moves on without it.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the execution plan for a classified request.
pub struct PlanBuilder {
    oracle: Arc<dyn MaterialOracle>,
    readiness_timeout: Duration,
}

impl PlanBuilder {
    pub fn new(oracle: Arc<dyn MaterialOracle>) -> Self {
        Self {
            oracle,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }

    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    /// Populate `plan` and reset `current_step`, or set `plan_error`.
    ///
    /// A caller-seeded plan is left untouched. Oracle failures degrade to
    /// the unfiltered material list.
    pub async fn build(&self, ctx: &mut TaskContext) {
        if !ctx.plan.is_empty() {
            debug!(
                session_id = %ctx.session_id,
                steps = ctx.plan.len(),
                "Plan pre-seeded by caller, skipping construction"
            );
            return;
        }

        let intent = ctx.intent;

        if intent.is_some_and(|i| i.reads_materials()) && !ctx.material_ids.is_empty() {
            match self.ready_materials(&ctx.material_ids).await {
                Ok(ready) if ready.is_empty() => {
                    warn!(
                        session_id = %ctx.session_id,
                        requested = ctx.material_ids.len(),
                        "No requested materials are fully processed"
                    );
                    ctx.plan.clear();
                    ctx.current_step = 0;
                    ctx.plan_error = Some(PlanError::NoCompletedMaterials);
                    return;
                }
                Ok(ready) => {
                    if ready.len() < ctx.material_ids.len() {
                        debug!(
                            requested = ctx.material_ids.len(),
                            ready = ready.len(),
                            "Dropping materials that are still processing"
                        );
                    }
                    ctx.material_ids = ready;
                }
                Err(e) => {
                    warn!(
                        session_id = %ctx.session_id,
                        error = %e,
                        "Readiness check failed, proceeding with all materials"
                    );
                }
            }
        }

        ctx.plan = match intent {
            Some(intent) => Self::plan_for(intent, &ctx.user_message),
            None => vec![Self::retrieval_step("Retrieve relevant passages")],
        };
        ctx.current_step = 0;
        ctx.plan_error = None;

        info!(
            session_id = %ctx.session_id,
            steps = ?ctx.plan.iter().map(|s| s.tool.as_str()).collect::<Vec<_>>(),
            "Plan built"
        );
    }

    async fn ready_materials(&self, material_ids: &[String]) -> Result<Vec<String>, MaterialError> {
        tokio::time::timeout(self.readiness_timeout, self.oracle.completed(material_ids))
            .await
            .map_err(|_| {
                MaterialError::QueryFailed(format!(
                    "no readiness answer after {}s",
                    self.readiness_timeout.as_secs()
                ))
            })?
    }

    /// The deterministic plan for an intent.
    pub fn plan_for(intent: Intent, message: &str) -> Vec<PlanStep> {
        match intent {
            Intent::Question => vec![
                Self::retrieval_step("Retrieve passages that answer the question"),
                PlanStep::new(
                    names::RESEARCH,
                    "Search the web when the materials have nothing relevant",
                )
                .only_if_previous_empty(),
            ],
            Intent::DataAnalysis => vec![
                Self::retrieval_step("Retrieve the data to analyze"),
                PlanStep::new(names::PYTHON, "Analyze the retrieved data with code").chained(),
            ],
            Intent::Research => vec![PlanStep::new(names::RESEARCH, "Research the topic on the web")],
            Intent::CodeExecution => {
                vec![PlanStep::new(names::PYTHON, "Write and run code for the request")]
            }
            Intent::ContentGeneration => {
                let tool = Self::content_tool(message);
                vec![PlanStep::new(tool, format!("Generate content with {tool}"))]
            }
        }
    }

    /// Pick the content-generation tool from keywords in the message.
    pub fn content_tool(message: &str) -> &'static str {
        let lowered = message.to_lowercase();
        CONTENT_TOOLS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&lowered, k)))
            .map(|(tool, _)| *tool)
            .unwrap_or(names::RAG)
    }

    fn retrieval_step(description: &str) -> PlanStep {
        PlanStep::new(names::RAG, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{StalledOracle, StaticOracle};
    use wayfinder_core::plan::StepCondition;

    fn ctx(message: &str, intent: Intent) -> TaskContext {
        TaskContext::new(message, "nb-1", "u-1", "s-1").with_intent(intent, 0.9)
    }

    fn tools(plan: &[PlanStep]) -> Vec<&str> {
        plan.iter().map(|s| s.tool.as_str()).collect()
    }

    #[tokio::test]
    async fn question_without_materials_skips_oracle() {
        let oracle = Arc::new(StaticOracle::ready(&[]));
        let builder = PlanBuilder::new(oracle.clone());
        let mut c = ctx("what is osmosis", Intent::Question);

        builder.build(&mut c).await;

        assert_eq!(oracle.call_count(), 0);
        assert_eq!(tools(&c.plan), vec![names::RAG, names::RESEARCH]);
        assert_eq!(c.plan[1].condition, Some(StepCondition::RunIfPreviousEmpty));
        assert_eq!(c.current_step, 0);
        assert!(c.plan_error.is_none());
    }

    #[tokio::test]
    async fn no_ready_materials_is_terminal_plan_error() {
        let oracle = Arc::new(StaticOracle::ready(&[]));
        let builder = PlanBuilder::new(oracle.clone());
        let mut c = ctx("what is osmosis", Intent::Question).with_materials(["m1", "m2"]);

        builder.build(&mut c).await;

        assert_eq!(oracle.call_count(), 1);
        assert!(c.plan.is_empty());
        assert_eq!(c.plan_error, Some(PlanError::NoCompletedMaterials));
    }

    #[tokio::test]
    async fn materials_are_narrowed_to_ready_subset() {
        let oracle = Arc::new(StaticOracle::ready(&["m2"]));
        let builder = PlanBuilder::new(oracle);
        let mut c = ctx("summarize chapter 3", Intent::ContentGeneration)
            .with_materials(["m1", "m2", "m3"]);

        builder.build(&mut c).await;

        assert_eq!(c.material_ids, vec!["m2".to_string()]);
        assert_eq!(tools(&c.plan), vec![names::RAG]);
    }

    #[tokio::test]
    async fn oracle_failure_keeps_all_materials() {
        let oracle = Arc::new(StaticOracle::failing());
        let builder = PlanBuilder::new(oracle.clone());
        let mut c =
            ctx("chart revenue by month", Intent::DataAnalysis).with_materials(["m1", "m2"]);

        builder.build(&mut c).await;

        assert_eq!(oracle.call_count(), 1);
        assert_eq!(c.material_ids.len(), 2);
        assert!(c.plan_error.is_none());
        assert_eq!(tools(&c.plan), vec![names::RAG, names::PYTHON]);
        assert!(c.plan[1].consumes_previous_output);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_oracle_times_out_to_all_materials() {
        let builder =
            PlanBuilder::new(Arc::new(StalledOracle)).with_readiness_timeout(Duration::from_secs(1));
        let mut c = ctx("what is osmosis", Intent::Question).with_materials(["m1", "m2"]);

        builder.build(&mut c).await;

        assert_eq!(c.material_ids, vec!["m1".to_string(), "m2".to_string()]);
        assert!(c.plan_error.is_none());
        assert_eq!(tools(&c.plan), vec![names::RAG, names::RESEARCH]);
    }

    #[tokio::test]
    async fn research_intent_never_checks_materials() {
        let oracle = Arc::new(StaticOracle::ready(&[]));
        let builder = PlanBuilder::new(oracle.clone());
        let mut c = ctx("latest news on fusion", Intent::Research).with_materials(["m1"]);

        builder.build(&mut c).await;

        assert_eq!(oracle.call_count(), 0);
        assert_eq!(tools(&c.plan), vec![names::RESEARCH]);
    }

    #[tokio::test]
    async fn seeded_plan_is_left_alone() {
        let oracle = Arc::new(StaticOracle::ready(&[]));
        let builder = PlanBuilder::new(oracle.clone());
        let seeded = vec![PlanStep::new(names::PYTHON, "custom")];
        let mut c = ctx("anything", Intent::Question)
            .with_materials(["m1"])
            .with_plan(seeded.clone());

        builder.build(&mut c).await;

        assert_eq!(c.plan, seeded);
        assert_eq!(oracle.call_count(), 0);
        assert!(c.plan_error.is_none());
    }

    #[tokio::test]
    async fn unclassified_request_gets_retrieval_fallback() {
        let builder = PlanBuilder::new(Arc::new(StaticOracle::ready(&[])));
        let mut c = TaskContext::new("hello", "nb-1", "u-1", "s-1");

        builder.build(&mut c).await;

        assert_eq!(tools(&c.plan), vec![names::RAG]);
    }

    #[test]
    fn content_tool_keywords() {
        assert_eq!(PlanBuilder::content_tool("make me a quiz on photosynthesis"), names::QUIZ);
        assert_eq!(PlanBuilder::content_tool("Practice questions for finals"), names::QUIZ);
        assert_eq!(PlanBuilder::content_tool("flashcards for chapter 2"), names::FLASHCARD);
        assert_eq!(PlanBuilder::content_tool("build slides on the latest results"), names::PPT);
        assert_eq!(PlanBuilder::content_tool("a study guide for the exam"), names::RAG);
        assert_eq!(PlanBuilder::content_tool("generate something nice"), names::RAG);
    }

    #[test]
    fn code_execution_plan_is_single_step() {
        let plan = PlanBuilder::plan_for(Intent::CodeExecution, "run this");
        assert_eq!(tools(&plan), vec![names::PYTHON]);
    }
}
