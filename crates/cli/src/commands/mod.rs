//! Subcommand implementations.

pub mod ask;
pub mod config_cmd;
pub mod gateway;
pub mod memory;
pub mod status;
pub mod welcome;

use std::path::Path;

use vera_config::AppConfig;

/// Load the configuration from `path` (or the default location), apply
/// environment overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into());
    };

    tracing::debug!(path = %path.display(), "Loading config from explicit path");
    let mut config =
        AppConfig::load_from(path).map_err(|e| format!("Failed to load config: {e}"))?;
    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}
