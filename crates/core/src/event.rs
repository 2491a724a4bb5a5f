//! Domain event system: observe the pipeline without coupling to it.
//!
//! The dispatch loop publishes an event at every stage boundary. Hosts can
//! subscribe for audit logging or progress streaming; nobody has to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::context::{PlanError, StoppedReason};
use crate::intent::Intent;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The request was assigned an intent
    IntentClassified {
        session_id: String,
        intent: Intent,
        confidence: f32,
        escalated: bool,
        timestamp: DateTime<Utc>,
    },

    /// A plan was built (or planning failed terminally)
    PlanBuilt {
        session_id: String,
        steps: Vec<String>,
        plan_error: Option<PlanError>,
        timestamp: DateTime<Utc>,
    },

    /// A plan step's tool was executed
    ToolExecuted {
        session_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// The governor finished one reflection cycle
    ReflectionCompleted {
        session_id: String,
        iteration: u32,
        outcome: String, // "continue", "retry", "fallback", "stop"
        timestamp: DateTime<Utc>,
    },

    /// The control loop exited
    PipelineFinished {
        session_id: String,
        stopped_reason: Option<StoppedReason>,
        plan_error: Option<PlanError>,
        tool_calls: u32,
        tokens: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
