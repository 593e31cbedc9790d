//! Promethios CLI — the main entry point.
//!
//! Commands:
//! - `chat`      — Talk to a governed agent (interactive or single message)
//! - `agents`    — List the configured agent roster
//! - `plugins`   — List governance plugins and their state
//! - `providers` — List configured providers (`--check` probes each one)
//! - `config`    — Show, validate, or locate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promethios",
    about = "Promethios — governed multi-agent LLM console",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read configuration from this file instead of ~/.promethios/config.toml
    #[arg(short, long, global = true, env = "PROMETHIOS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with an agent
    Chat {
        /// Agent id from the roster
        #[arg(short, long, default_value = "technical-lead")]
        agent: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Bypass the governance pipeline for this session
        #[arg(long)]
        ungoverned: bool,
    },

    /// List the agent roster
    Agents,

    /// List governance plugins
    Plugins,

    /// List configured providers
    Providers {
        /// Probe each provider's endpoint with its configured credentials
        #[arg(long)]
        check: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Check the configuration for errors
    Validate,
    /// Print the configuration file path
    Path,
    /// Print a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat {
            agent,
            message,
            ungoverned,
        } => commands::chat::run(config_path, &agent, message, ungoverned).await?,
        Commands::Agents => commands::agents::run(config_path).await?,
        Commands::Plugins => commands::plugins::run(config_path).await?,
        Commands::Providers { check } => commands::providers::run(config_path, check).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
