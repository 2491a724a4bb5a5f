//! `wayfinder plan`: classify a request and show the plan it would get.

use std::sync::Arc;

use tracing::debug;
use wayfinder_agent::{IntentClassifier, PlanBuilder};
use wayfinder_config::AppConfig;
use wayfinder_core::provider::OfflineProvider;

use super::RequestArgs;

pub async fn run(request: RequestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // No language model offline: ambiguous requests keep their rule-based intent
    let classifier = IntentClassifier::new(Arc::new(OfflineProvider), config.default_model.clone())
        .with_settings(config.classifier.clone());
    let planner = PlanBuilder::new(request.oracle());
    debug!(model = %config.default_model, "Planning offline, escalation disabled");

    let mut ctx = request.context();
    let classification = classifier.classify(&mut ctx).await;
    planner.build(&mut ctx).await;

    let report = serde_json::json!({
        "session_id": ctx.session_id,
        "intent": classification.intent,
        "confidence": classification.confidence,
        "escalated": classification.escalated,
        "material_ids": ctx.material_ids,
        "plan": ctx.plan,
        "plan_error": ctx.plan_error,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
