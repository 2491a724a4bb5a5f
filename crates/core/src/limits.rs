//! Tunable ceilings and thresholds for the pipeline.
//!
//! These are plain values handed to the governor and classifier
//! constructors. Each request can run with its own set.

use serde::{Deserialize, Serialize};

/// Hard ceilings enforced by the reflection governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorLimits {
    /// Reflection cycles per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Tool invocations per request
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Estimated tokens per request
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,

    /// Retries of a single failing step before it is abandoned
    #[serde(default = "default_max_step_retries")]
    pub max_step_retries: u32,

    /// Trimmed output shorter than this counts as a weak answer
    #[serde(default = "default_min_useful_output_len")]
    pub min_useful_output_len: usize,
}

fn default_max_iterations() -> u32 {
    7
}
fn default_max_tool_calls() -> u32 {
    10
}
fn default_token_budget() -> u64 {
    12_000
}
fn default_max_step_retries() -> u32 {
    2
}
fn default_min_useful_output_len() -> usize {
    50
}

impl Default for GovernorLimits {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tool_calls: default_max_tool_calls(),
            token_budget: default_token_budget(),
            max_step_retries: default_max_step_retries(),
            min_useful_output_len: default_min_useful_output_len(),
        }
    }
}

/// Settings for intent classification and its LLM escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// A fast-path QUESTION at or below this confidence is escalated
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: f32,

    /// Output budget for the escalation call
    #[serde(default = "default_classifier_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Seconds to wait for the escalation reply before keeping the fast path
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,

    /// Model override for escalation; falls back to the app default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_escalation_threshold() -> f32 {
    0.55
}
fn default_classifier_max_tokens() -> u32 {
    20
}
fn default_classifier_timeout_secs() -> u64 {
    10
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            escalation_threshold: default_escalation_threshold(),
            max_tokens: default_classifier_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_classifier_timeout_secs(),
            model: None,
        }
    }
}
