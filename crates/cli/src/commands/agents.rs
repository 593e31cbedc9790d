//! `promethios agents` — List the agent roster.

use std::path::Path;
use std::sync::Arc;

use promethios_agent::AgentRoster;
use promethios_core::event::NoopObserver;
use promethios_dispatch::Dispatcher;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config));
    let roster = AgentRoster::from_config(&config, dispatcher, Arc::new(NoopObserver))?;

    println!("Agents");
    println!("======");
    println!();
    println!("  {:<20} {:<22} {:<16} {:<12} Governed", "Id", "Name", "Role", "Provider");
    for profile in roster.profiles() {
        println!(
            "  {:<20} {:<22} {:<16} {:<12} {}",
            profile.id,
            profile.name,
            profile.role.key,
            profile.provider.as_deref().unwrap_or(&config.default_provider),
            if profile.is_governed { "yes" } else { "no" }
        );
    }
    println!();
    if config.agents.is_empty() {
        println!("  (built-in roster; add [[agents]] entries to your config to customize)");
    }

    Ok(())
}
