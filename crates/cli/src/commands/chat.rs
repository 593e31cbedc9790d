//! `promethios chat` — Interactive or single-message chat with one agent.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use promethios_agent::{Agent, AgentReply, AgentRoster};
use promethios_config::AppConfig;
use promethios_core::event::TracingObserver;
use promethios_dispatch::Dispatcher;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    agent_id: &str,
    message: Option<String>,
    ungoverned: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PROMETHIOS_API_KEY = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'   (for OpenAI)");
        eprintln!("    ANTHROPIC_API_KEY  = 'sk-ant-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let agent = build_agent(&config, agent_id, ungoverned)?;
    info!(
        agent_id = %agent.id(),
        role = %agent.profile().role.key,
        governed = agent.profile().is_governed,
        "Chat session started"
    );

    match message {
        Some(msg) => {
            eprint!("  Thinking...");
            let result = agent.generate_response(&msg, None).await;
            eprint!("\r              \r");
            let reply = result?;
            print_interventions(&reply);
            println!("{}", reply.text);
        }
        None => interactive(&config, &agent).await?,
    }

    agent.dispose().await;
    Ok(())
}

/// Look up `agent_id` in the roster, rebuilt ungoverned if requested.
fn build_agent(
    config: &AppConfig,
    agent_id: &str,
    ungoverned: bool,
) -> Result<Arc<Agent>, Box<dyn std::error::Error>> {
    let dispatcher = Arc::new(Dispatcher::from_config(config));
    let observer = Arc::new(TracingObserver);
    let roster = AgentRoster::from_config(config, Arc::clone(&dispatcher), observer.clone())?;

    let agent = roster.get(agent_id).ok_or_else(|| {
        format!(
            "Unknown agent '{agent_id}'. Available: {}",
            roster.ids().join(", ")
        )
    })?;

    if !ungoverned {
        return Ok(agent);
    }

    let profile = agent.profile().clone().governed(false);
    Ok(Arc::new(
        Agent::new(profile, dispatcher)
            .with_history_cap(config.history_cap)
            .with_defaults(config.default_temperature, config.default_max_tokens)
            .with_observer(observer),
    ))
}

async fn interactive(config: &AppConfig, agent: &Agent) -> Result<(), Box<dyn std::error::Error>> {
    let profile = agent.profile();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Promethios — Governed Agent Chat      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Agent:      {} ({})", profile.name, profile.id);
    println!("  Role:       {}", profile.role.key);
    println!(
        "  Provider:   {}",
        profile.provider.as_deref().unwrap_or(&config.default_provider)
    );
    println!(
        "  Governance: {}",
        if profile.is_governed { "on" } else { "OFF" }
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  '/reset' clears the conversation, 'exit' quits.");
    println!("  Ctrl+C cancels a pending request, or quits at the prompt.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupts = spawn_interrupt_listener();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = next_input(&mut lines, &mut interrupts).await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                agent.reset_conversation().await;
                println!("  (conversation cleared)");
                println!();
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        eprint!("  ...");
        let result = cancel_on_interrupt(
            agent.generate_response_with_cancel(input, None, &cancel),
            &cancel,
            &mut interrupts,
        )
        .await;
        eprint!("\r     \r");

        match result {
            Ok(reply) => {
                println!();
                print_interventions(&reply);
                for line in reply.text.lines() {
                    println!("  {} > {line}", profile.name);
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// One SIGINT handler for the whole session. Once installed it replaces the
/// default exit-on-Ctrl+C, so every interrupt is routed through the channel.
fn spawn_interrupt_listener() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Next input line, or `None` on EOF or an interrupt at the prompt.
async fn next_input<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> std::io::Result<Option<String>> {
    tokio::select! {
        line = lines.next_line() => line,
        Some(()) = interrupts.recv() => Ok(None),
    }
}

/// Drive `request` to completion, firing `cancel` on each interrupt.
async fn cancel_on_interrupt<F: Future>(
    request: F,
    cancel: &CancellationToken,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> F::Output {
    tokio::pin!(request);
    loop {
        tokio::select! {
            output = &mut request => return output,
            Some(()) = interrupts.recv() => cancel.cancel(),
        }
    }
}

fn print_interventions(reply: &AgentReply) {
    for intervention in &reply.interventions {
        eprintln!(
            "  [governance] {} ({}): {}",
            intervention.kind, intervention.severity, intervention.description
        );
    }
}
