//! `wayfinder config`: Configuration management commands.

use wayfinder_config::AppConfig;

pub fn show(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if json {
        println!("{}", config.to_json()?);
    } else {
        println!("{}", config.to_toml());
    }
    Ok(())
}

pub fn defaults() {
    println!("{}", AppConfig::default_toml());
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            let g = &config.governor;

            if g.max_tool_calls < g.max_iterations {
                warnings.push("max_tool_calls is below max_iterations; tool calls will be the binding limit");
            }
            if g.max_step_retries >= g.max_iterations {
                warnings.push("max_step_retries leaves no iterations for later steps");
            }
            if config.classifier.escalation_threshold < 0.5 {
                warnings.push("escalation_threshold below 0.5 disables language-model escalation");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Model:       {}", config.default_model);
            println!("   Classifier:  {}", config.classifier_model());
            println!(
                "   Limits:      {} iterations, {} tool calls, {} tokens",
                g.max_iterations, g.max_tool_calls, g.token_budget
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}
