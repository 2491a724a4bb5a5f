//! Tool trait: the abstraction over capability handlers.
//!
//! Tools (retrieval, code execution, web research, content generation) live
//! outside this workspace. The pipeline only depends on the contract below:
//! a tool receives a [`ToolInvocation`] and answers with a [`ToolResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;
use crate::message::Message;

/// Well-known tool identifiers referenced by the plan builder.
pub mod names {
    pub const RAG: &str = "rag_tool";
    pub const RESEARCH: &str = "research_tool";
    pub const PYTHON: &str = "python_tool";
    pub const QUIZ: &str = "quiz_tool";
    pub const FLASHCARD: &str = "flashcard_tool";
    pub const PPT: &str = "ppt_tool";
}

/// Everything a tool gets to see for one plan step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub user_message: String,
    pub notebook_id: String,
    pub user_id: String,
    pub session_id: String,
    pub material_ids: Vec<String>,

    /// Caller-supplied conversation history
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,

    /// The plan step's description
    pub step_description: String,

    /// Output of the previous step, for chained steps only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_output: Option<String>,
}

/// The result of a tool execution.
///
/// `success == false` makes the step eligible for retry. A successful
/// result with near-empty output is a separate "weak result" case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Which tool produced this
    pub tool: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Canonical output text (may be empty, never absent)
    #[serde(default)]
    pub output: String,

    /// Structured metadata (sources, artifact ids, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Error text for failed executions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Estimated tokens consumed producing this result
    #[serde(default)]
    pub tokens_used: u32,

    /// Pre-truncated summary, when the tool provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ToolResult {
    /// A successful result.
    pub fn ok(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            output: output.into(),
            metadata: serde_json::Map::new(),
            error: None,
            tokens_used: 0,
            summary: None,
        }
    }

    /// A failed result with empty output.
    pub fn failed(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            output: String::new(),
            metadata: serde_json::Map::new(),
            error: Some(error.into()),
            tokens_used: 0,
            summary: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Length of the output once surrounding whitespace is stripped.
    pub fn trimmed_len(&self) -> usize {
        self.output.trim().chars().count()
    }
}

/// The core Tool trait.
///
/// Each capability handler implements this trait and is registered in the
/// [`ToolRegistry`] the dispatch loop uses.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "rag_tool").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// Execute the tool for one plan step.
    async fn execute(
        &self,
        invocation: ToolInvocation,
    ) -> std::result::Result<ToolResult, ToolError>;
}

/// A registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Execute the named tool.
    pub async fn execute(
        &self,
        name: &str,
        invocation: ToolInvocation,
    ) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| {
                tracing::warn!(tool = %name, "No tool registered under this name");
                ToolError::NotFound(name.to_string())
            })?;
        tool.execute(invocation).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the user message"
        }
        async fn execute(
            &self,
            invocation: ToolInvocation,
        ) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::ok("echo", invocation.user_message).with_tokens(3))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let invocation = ToolInvocation {
            user_message: "hello world".into(),
            ..Default::default()
        };
        let result = registry.execute("echo", invocation).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
        assert_eq!(result.tokens_used, 3);
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nonexistent", ToolInvocation::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn failed_result_has_empty_output_and_error() {
        let result = ToolResult::failed(names::PYTHON, "timeout");
        assert!(!result.success);
        assert_eq!(result.output, "");
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn trimmed_len_ignores_whitespace() {
        let result = ToolResult::ok(names::RAG, "  \n  abc \n");
        assert_eq!(result.trimmed_len(), 3);
    }
}
