//! CLI subcommands.

pub mod agents;
pub mod chat;
pub mod config_cmd;
pub mod plugins;
pub mod providers;

use std::path::Path;

use promethios_config::AppConfig;

/// Load from `path` when given, otherwise from the default location. Both
/// get the environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
