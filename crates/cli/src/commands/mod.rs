pub mod config_cmd;
pub mod demo;
pub mod plan;
pub mod run;

use std::sync::Arc;

use clap::Args;
use wayfinder_core::context::TaskContext;
use wayfinder_core::intent::Intent;
use wayfinder_core::material::{AssumeAllReady, MaterialOracle};

/// Request inputs shared by `plan` and `run`.
#[derive(Args)]
pub struct RequestArgs {
    /// The user's message
    pub message: String,

    /// A material to read from (repeatable)
    #[arg(short = 'm', long = "material")]
    pub materials: Vec<String>,

    /// Comma-separated materials that have finished processing.
    /// Every material is treated as ready when omitted.
    #[arg(long, value_delimiter = ',')]
    pub ready: Option<Vec<String>>,

    /// Skip classification and force this intent
    #[arg(long)]
    pub intent: Option<Intent>,

    #[arg(long, default_value = "local")]
    pub notebook: String,

    #[arg(long, default_value = "local-user")]
    pub user: String,

    /// Session id; a random one is generated when omitted
    #[arg(long)]
    pub session: Option<String>,
}

impl RequestArgs {
    pub fn context(&self) -> TaskContext {
        let session = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let ctx = TaskContext::new(&self.message, &self.notebook, &self.user, session)
            .with_materials(self.materials.iter().cloned());
        match self.intent {
            Some(intent) => ctx.with_intent_override(intent),
            None => ctx,
        }
    }

    pub fn oracle(&self) -> Arc<dyn MaterialOracle> {
        match &self.ready {
            Some(ready) => Arc::new(demo::ReadySet::new(ready.clone())),
            None => Arc::new(AssumeAllReady),
        }
    }
}
