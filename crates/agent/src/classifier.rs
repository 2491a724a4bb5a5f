//! Intent classification.
//!
//! A static, ordered rule table is tried first. Categories overlap, so order
//! is significant: data-analysis phrasing must win over the generic
//! question rules. Only a genuinely ambiguous QUESTION (confidence at or
//! below the escalation threshold) is sent to the language model, and any
//! provider failure or a reply slower than `timeout_secs` keeps the
//! fast-path answer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use wayfinder_core::context::TaskContext;
use wayfinder_core::error::ProviderError;
use wayfinder_core::intent::Intent;
use wayfinder_core::limits::ClassifierSettings;
use wayfinder_core::provider::{Provider, ProviderRequest};

/// Confidence assigned to an escalation reply that names a category.
const ESCALATED_CONFIDENCE: f32 = 0.75;

/// Confidence when the escalation reply names no category at all.
const UNPARSED_CONFIDENCE: f32 = 0.60;

/// One way a rule can match the lower-cased message.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Whole-word (or whole-phrase) occurrence anywhere
    Term(&'static str),
    /// The message opens with this word
    Prefix(&'static str),
    /// The trimmed message ends with this text
    Suffix(&'static str),
    /// Always matches
    Any,
}

impl Pattern {
    fn matches(&self, message: &str) -> bool {
        match *self {
            Self::Term(term) => contains_term(message, term),
            Self::Prefix(word) => message
                .trim_start()
                .strip_prefix(word)
                .is_some_and(|rest| rest.chars().next().is_none_or(|c| !c.is_alphanumeric())),
            Self::Suffix(tail) => message.trim_end().ends_with(tail),
            Self::Any => true,
        }
    }
}

struct Rule {
    intent: Intent,
    patterns: &'static [Pattern],
    confidence: f32,
}

impl Rule {
    fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(message))
    }
}

use Pattern::{Any, Prefix, Suffix, Term};

/// Evaluated top to bottom; the first matching rule wins.
static RULES: &[Rule] = &[
    Rule {
        intent: Intent::DataAnalysis,
        patterns: &[
            Term("analyze"),
            Term("analyse"),
            Term("analyzing"),
            Term("analysing"),
            Term("analysis"),
            Term("data"),
            Term("dataset"),
            Term("datasets"),
            Term("csv"),
            Term("spreadsheet"),
            Term("excel"),
            Term("statistics"),
            Term("statistical"),
            Term("correlation"),
            Term("regression"),
            Term("chart"),
            Term("plot"),
            Term("visualize"),
            Term("visualise"),
            Term("trend"),
            Term("trends"),
        ],
        confidence: 0.90,
    },
    Rule {
        intent: Intent::CodeExecution,
        patterns: &[
            Term("run this code"),
            Term("run the code"),
            Term("execute"),
            Term("python"),
            Term("script"),
            Term("code"),
            Term("write a program"),
            Term("calculate"),
            Term("compute"),
            Term("simulate"),
        ],
        confidence: 0.88,
    },
    Rule {
        intent: Intent::ContentGeneration,
        patterns: &[
            Term("quiz"),
            Term("quizzes"),
            Term("flashcard"),
            Term("flashcards"),
            Term("presentation"),
            Term("slides"),
            Term("slide deck"),
            Term("ppt"),
            Term("study guide"),
            Term("summary"),
            Term("summarize"),
            Term("summarise"),
            Term("notes"),
            Term("practice questions"),
            Term("make me"),
            Term("generate"),
            Term("create a"),
        ],
        confidence: 0.85,
    },
    Rule {
        intent: Intent::Research,
        patterns: &[
            Term("research"),
            Term("latest"),
            Term("news"),
            Term("search the web"),
            Term("search online"),
            Term("look up"),
            Term("online"),
            Term("current events"),
            Term("recent"),
            Term("recently"),
        ],
        confidence: 0.80,
    },
    Rule {
        intent: Intent::Question,
        patterns: &[
            Prefix("what"),
            Prefix("why"),
            Prefix("how"),
            Prefix("who"),
            Prefix("when"),
            Prefix("where"),
            Prefix("which"),
            Prefix("explain"),
            Prefix("define"),
            Prefix("describe"),
            Suffix("?"),
        ],
        confidence: 0.70,
    },
    Rule {
        intent: Intent::Question,
        patterns: &[Any],
        confidence: 0.50,
    },
];

const ESCALATION_PROMPT: &str = "Classify the user's request into exactly one category.

Categories:
- QUESTION: asking about the content of their study materials
- DATA_ANALYSIS: analyzing data, tables, numbers or charts
- RESEARCH: needs up-to-date information from the web
- CODE_EXECUTION: writing or running code
- CONTENT_GENERATION: making a quiz, flashcards, slides, notes or a summary

Reply with the category name only.

Request: ";

/// The outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    /// Whether the language model was consulted and answered
    pub escalated: bool,
}

/// Maps a user message to one of the five intents.
pub struct IntentClassifier {
    provider: Arc<dyn Provider>,
    model: String,
    settings: ClassifierSettings,
}

impl IntentClassifier {
    /// Create a classifier that escalates ambiguous requests to `provider`.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            settings: ClassifierSettings::default(),
        }
    }

    /// Replace the escalation settings.
    pub fn with_settings(mut self, settings: ClassifierSettings) -> Self {
        if let Some(model) = &settings.model {
            self.model = model.clone();
        }
        self.settings = settings;
        self
    }

    /// Classify the request and record the result on the context.
    ///
    /// Never fails: provider errors fall back to the rule-table answer.
    pub async fn classify(&self, ctx: &mut TaskContext) -> Classification {
        if let Some(intent) = ctx.intent_override {
            debug!(session_id = %ctx.session_id, %intent, "Intent forced by caller");
            return Self::record(ctx, intent, 1.0, false);
        }

        if let Some(intent) = ctx.intent {
            if ctx.intent_confidence >= 1.0 {
                return Classification {
                    intent,
                    confidence: ctx.intent_confidence,
                    escalated: false,
                };
            }
        }

        let (intent, confidence) = Self::fast_path(&ctx.user_message);
        let mut result = Classification {
            intent,
            confidence,
            escalated: false,
        };

        if intent == Intent::Question && confidence <= self.settings.escalation_threshold {
            match self.escalate(&ctx.user_message).await {
                Ok((intent, confidence)) => {
                    result = Classification {
                        intent,
                        confidence,
                        escalated: true,
                    };
                }
                Err(e) => {
                    warn!(
                        session_id = %ctx.session_id,
                        provider = self.provider.name(),
                        error = %e,
                        "Intent escalation failed, keeping rule-based intent"
                    );
                }
            }
        }

        info!(
            session_id = %ctx.session_id,
            intent = %result.intent,
            confidence = result.confidence,
            escalated = result.escalated,
            "Intent classified"
        );
        Self::record(ctx, result.intent, result.confidence, result.escalated)
    }

    /// Evaluate the rule table against a message.
    pub fn fast_path(message: &str) -> (Intent, f32) {
        let lowered = message.to_lowercase();
        RULES
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| (rule.intent, rule.confidence))
            .unwrap_or((Intent::Question, 0.50))
    }

    async fn escalate(&self, message: &str) -> Result<(Intent, f32), ProviderError> {
        let request = ProviderRequest::from_prompt(
            self.model.clone(),
            format!("{ESCALATION_PROMPT}{message}"),
        )
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        let timeout = Duration::from_secs(self.settings.timeout_secs);
        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.provider.name(),
                    timeout.as_secs()
                ))
            })??;
        debug!(reply = %response.content.trim(), "Escalation reply");
        Ok(parse_label(&response.content))
    }

    fn record(
        ctx: &mut TaskContext,
        intent: Intent,
        confidence: f32,
        escalated: bool,
    ) -> Classification {
        ctx.intent = Some(intent);
        ctx.intent_confidence = confidence;
        Classification {
            intent,
            confidence,
            escalated,
        }
    }
}

/// Read an intent out of a free-form model reply.
///
/// Scans the upper-cased reply for each label in priority order; a reply
/// naming none of them is treated as a QUESTION.
pub fn parse_label(reply: &str) -> (Intent, f32) {
    let upper = reply.to_uppercase();
    Intent::ESCALATION_ORDER
        .into_iter()
        .find(|intent| upper.contains(intent.label()))
        .map(|intent| (intent, ESCALATED_CONFIDENCE))
        .unwrap_or((Intent::Question, UNPARSED_CONFIDENCE))
}

/// Whole-word containment: `term` must not be glued to letters or digits.
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        before.is_none_or(|c| !c.is_alphanumeric()) && after.is_none_or(|c| !c.is_alphanumeric())
    })
}
