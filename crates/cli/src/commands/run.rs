//! `wayfinder run`: drive one request through the full loop.

use std::sync::Arc;

use tracing::{debug, info};
use wayfinder_agent::Pipeline;
use wayfinder_config::AppConfig;
use wayfinder_core::event::EventBus;
use wayfinder_core::provider::OfflineProvider;

use super::RequestArgs;
use super::demo::demo_registry;

pub async fn run(
    request: RequestArgs,
    json: bool,
    show_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    debug!(
        model = %config.default_model,
        max_iterations = config.governor.max_iterations,
        token_budget = config.governor.token_budget,
        "Configuration loaded"
    );

    let event_bus = Arc::new(EventBus::default());
    let mut events = event_bus.subscribe();

    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(OfflineProvider),
        request.oracle(),
        Arc::new(demo_registry()),
        event_bus,
    );

    let mut ctx = request.context();
    let outcome = pipeline.run(&mut ctx).await;
    info!(
        session_id = %ctx.session_id,
        tool_calls = ctx.total_tool_calls,
        tokens = ctx.total_tokens,
        "Run finished"
    );

    if show_events {
        while let Ok(event) = events.try_recv() {
            println!("{}", serde_json::to_string(event.as_ref())?);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.summary);
    }
    Ok(())
}
