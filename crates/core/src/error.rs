//! Error types for the Wayfinder domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum. None of these ever
//! escape the pipeline stages: classification, planning and reflection
//! convert them into degraded defaults at the call site.

use thiserror::Error;

/// The top-level error type for all Wayfinder operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Language-model capability ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Readiness oracle ---
    #[error("Material error: {0}")]
    Material(#[from] MaterialError),

    // --- Tool layer ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum MaterialError {
    #[error("Material store unavailable: {0}")]
    Unavailable(String),

    #[error("Readiness query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}
