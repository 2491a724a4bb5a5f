//! Shared test doubles for the pipeline stages.

use std::sync::{Arc, Mutex};

use wayfinder_core::error::{MaterialError, ProviderError, ToolError};
use wayfinder_core::material::MaterialOracle;
use wayfinder_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use wayfinder_core::tool::{Tool, ToolInvocation, ToolResult};

/// A provider that returns scripted replies in sequence.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Vec<Result<String, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn replies(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| Ok(r.to_string())).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose single call fails.
    pub fn failing() -> Self {
        Self {
            replies: vec![Err(ProviderError::Timeout("scripted failure".into()))],
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        let reply = self.replies.get(index).unwrap_or_else(|| {
            panic!(
                "ScriptedProvider: no more replies (call #{}, have {})",
                index,
                self.replies.len()
            )
        });

        reply.clone().map(|content| ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 40,
                completion_tokens: 3,
                total_tokens: 43,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A provider whose replies never arrive.
pub struct StalledProvider;

#[async_trait::async_trait]
impl Provider for StalledProvider {
    fn name(&self) -> &str {
        "stalled_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// An oracle whose readiness answer never arrives.
pub struct StalledOracle;

#[async_trait::async_trait]
impl MaterialOracle for StalledOracle {
    async fn completed(&self, _material_ids: &[String]) -> Result<Vec<String>, MaterialError> {
        std::future::pending().await
    }
}

/// A readiness oracle with a fixed answer and a call counter.
pub struct StaticOracle {
    answer: Result<Vec<String>, MaterialError>,
    calls: Mutex<usize>,
}

impl StaticOracle {
    pub fn ready(ids: &[&str]) -> Self {
        Self {
            answer: Ok(ids.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(MaterialError::Unavailable("scripted outage".into())),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl MaterialOracle for StaticOracle {
    async fn completed(&self, material_ids: &[String]) -> Result<Vec<String>, MaterialError> {
        *self.calls.lock().unwrap() += 1;
        self.answer
            .clone()
            .map(|ready| ready.into_iter().filter(|id| material_ids.contains(id)).collect())
    }
}

/// A tool that plays back scripted results, repeating the last one once the
/// script runs out. Records every invocation it receives.
pub struct ScriptedTool {
    name: String,
    script: Vec<Result<ToolResult, String>>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedTool {
    pub fn new(name: &str, script: Vec<Result<ToolResult, String>>) -> Self {
        assert!(!script.is_empty(), "ScriptedTool needs at least one result");
        Self {
            name: name.to_string(),
            script,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds with `output`.
    pub fn answering(name: &str, output: &str, tokens: u32) -> Self {
        Self::new(name, vec![Ok(ToolResult::ok(name, output).with_tokens(tokens))])
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let mut invocations = self.invocations.lock().unwrap();
        let index = invocations.len().min(self.script.len() - 1);
        invocations.push(invocation);

        self.script[index]
            .clone()
            .map_err(|reason| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason,
            })
    }
}

/// Lets a test keep a handle on a tool after boxing it into a registry.
pub struct Shared<T>(pub Arc<T>);

#[async_trait::async_trait]
impl<T: Tool> Tool for Shared<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        self.0.execute(invocation).await
    }
}
