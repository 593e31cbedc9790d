//! `promethios providers` — List configured providers.

use std::path::Path;

use promethios_dispatch::ProviderRegistry;

pub async fn run(config_path: Option<&Path>, check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = ProviderRegistry::from_config(&config);
    let default = registry.default_id();

    println!("Providers");
    println!("=========");
    println!();
    for id in registry.list() {
        let kind = config
            .providers
            .get(&id)
            .map(|p| format!("{:?}", p.resolved_kind(&id)))
            .unwrap_or_else(|| "implicit".into());
        let marker = if default.as_deref() == Some(id.as_str()) {
            " (default)"
        } else {
            ""
        };
        if check {
            println!("  {id:<16} {kind:<14} {:<12}{marker}", health(&registry, &id).await);
        } else {
            println!("  {id:<16} {kind:<14}{marker}");
        }
    }
    println!();
    println!("  Any OpenAI-compatible endpoint works:");
    println!("    [providers.local]");
    println!("    api_url = \"http://localhost:11434/v1\"");
    println!("    default_model = \"llama3\"");
    println!();
    println!("  Environment variables:");
    println!("    PROMETHIOS_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY");
    println!("    PROMETHIOS_PROVIDER, PROMETHIOS_MODEL, PROMETHIOS_CONFIG");

    Ok(())
}

async fn health(registry: &ProviderRegistry, id: &str) -> String {
    let Some(provider) = registry.get(id) else {
        return "missing".into();
    };
    match provider.health_check().await {
        Ok(true) => "reachable".into(),
        Ok(false) => "rejected".into(),
        Err(e) => {
            tracing::debug!(provider = %id, error = %e, "Health check failed");
            "unreachable".into()
        }
    }
}
