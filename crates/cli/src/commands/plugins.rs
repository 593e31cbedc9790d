//! `promethios plugins` — List governance plugins.

use std::path::Path;

use promethios_governance::GovernancePipeline;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let pipeline = GovernancePipeline::from_config(&config.governance);

    println!("Governance Plugins (in execution order)");
    println!("=======================================");
    println!();
    for (i, plugin) in pipeline.list().iter().enumerate() {
        println!(
            "  {}. {:<18} {:<8} {:<7} {}",
            i + 1,
            plugin.id,
            if plugin.enabled { "enabled" } else { "disabled" },
            plugin.severity,
            plugin.summary
        );
    }
    println!();
    println!("  Default trust score: {:.2}", config.governance.default_trust_score);
    println!("  Policies:            {}", config.governance.policies.len());
    println!();
    println!("  Toggle plugins in the [governance] section of your config.");

    Ok(())
}
