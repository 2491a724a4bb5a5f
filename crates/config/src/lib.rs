//! Configuration loading, validation, and management for Wayfinder.
//!
//! Loads configuration from `~/.wayfinder/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wayfinder_core::limits::{ClassifierSettings, GovernorLimits};

/// The root configuration structure.
///
/// Maps directly to `~/.wayfinder/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default model for language-model calls
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Intent classification settings
    #[serde(default)]
    pub classifier: ClassifierSettings,

    /// Control-loop ceilings
    #[serde(default)]
    pub governor: GovernorLimits,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

impl AppConfig {
    /// Load configuration from the default path (~/.wayfinder/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `WAYFINDER_MODEL`
    /// - `WAYFINDER_MAX_ITERATIONS`
    /// - `WAYFINDER_MAX_TOOL_CALLS`
    /// - `WAYFINDER_TOKEN_BUDGET`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("WAYFINDER_MODEL") {
            self.default_model = model;
        }
        if let Some(v) = parse_env(&lookup, "WAYFINDER_MAX_ITERATIONS") {
            self.governor.max_iterations = v;
        }
        if let Some(v) = parse_env(&lookup, "WAYFINDER_MAX_TOOL_CALLS") {
            self.governor.max_tool_calls = v;
        }
        if let Some(v) = parse_env(&lookup, "WAYFINDER_TOKEN_BUDGET") {
            self.governor.token_budget = v;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wayfinder")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.governor;
        if g.max_iterations == 0 || g.max_tool_calls == 0 || g.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "governor max_iterations, max_tool_calls and token_budget must be > 0".into(),
            ));
        }

        let threshold = self.classifier.escalation_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(
                "classifier escalation_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        let temperature = self.classifier.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::ValidationError(
                "classifier temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.classifier.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "classifier timeout_secs must be > 0".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// The model the classifier escalates to.
    pub fn classifier_model(&self) -> &str {
        self.classifier
            .model
            .as_deref()
            .unwrap_or(&self.default_model)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Render this configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("cannot render config: {e}")))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            classifier: ClassifierSettings::default(),
            governor: GovernorLimits::default(),
        }
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
