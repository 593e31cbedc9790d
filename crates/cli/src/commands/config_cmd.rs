//! `promethios config` — Configuration management commands.

use std::path::Path;

use promethios_config::AppConfig;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e);
        }
    };
    println!("   Config parsed successfully");

    if let Err(e) = config.validate() {
        println!("   {e}");
        return Err(e.into());
    }

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set PROMETHIOS_API_KEY or OPENAI_API_KEY)".to_string());
    }
    for agent in &config.agents {
        if let Some(provider) = &agent.provider {
            if provider != &config.default_provider && !config.providers.contains_key(provider) {
                warnings.push(format!(
                    "Agent '{}' uses provider '{provider}', which is not configured",
                    agent.id
                ));
            }
        }
    }

    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Provider:    {}", config.default_provider);
    println!("   Model:       {}", config.default_model);
    println!("   Retries:     {}", config.dispatch.max_retries);
    println!("   History cap: {}", config.history_cap);
    println!("   Agents:      {}", config.agents.len());
    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    redact(&mut config);
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", AppConfig::config_dir().join("config.toml").display()),
    }
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}

fn redact(config: &mut AppConfig) {
    const MASK: &str = "[REDACTED]";
    if config.api_key.is_some() {
        config.api_key = Some(MASK.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(MASK.into());
        }
    }
}
