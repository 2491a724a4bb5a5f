//! # Wayfinder Core
//!
//! Domain types, traits, and error definitions for the Wayfinder
//! request-routing pipeline. This crate holds **no orchestration logic**:
//! it defines the data contract (the task context threaded through every
//! stage) and the seams the pipeline depends on but does not implement.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the language-model capability used for escalation
//! - [`MaterialOracle`]: "which of these materials are fully processed?"
//! - [`Tool`]: a capability handler that produces a [`ToolResult`]
//!
//! Implementations live elsewhere, so the orchestration crate can be tested
//! entirely with mocks.

pub mod context;
pub mod error;
pub mod event;
pub mod intent;
pub mod limits;
pub mod material;
pub mod message;
pub mod plan;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ContextSummary, PlanError, StoppedReason, TaskContext};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use intent::Intent;
pub use limits::{ClassifierSettings, GovernorLimits};
pub use material::{AssumeAllReady, MaterialOracle};
pub use message::{Message, Role};
pub use plan::{PlanStep, StepCondition};
pub use provider::{OfflineProvider, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolInvocation, ToolRegistry, ToolResult};
