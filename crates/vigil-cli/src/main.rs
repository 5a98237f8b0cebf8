//! `vigil-cli` – entry point for the unattended-agent stack.
//!
//! This binary:
//!
//! 1. Checks for `~/.vigil/config.toml`; writes the defaults on first run.
//! 2. Builds the built-in demo world and the agent on top of it.
//! 3. Clocks the agent at a fixed 50 ms cycle on a background task.
//! 4. Drops the user into an **interactive REPL** (`toggle`, `status`,
//!    perimeter commands).
//! 5. Intercepts **Ctrl-C** to stop the agent and exit safely.

mod config;
mod demo;
mod repl;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use colored::Colorize;
use tracing::warn;
use vigil_agent::{Agent, AgentConfig};

/// Nominal cycle length: the external clock of the core.
const CYCLE: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set VIGIL_LOG_FORMAT=json to emit newline-delimited JSON logs suitable
    // for log aggregators.  The CLI's user-facing output uses println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("VIGIL_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Config bootstrap ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = AgentConfig::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            AgentConfig::default()
        }
    };

    // ── Agent over the demo world ─────────────────────────────────────────
    let data_dir = config::data_dir();
    let agent = Agent::new(demo::build_world(), cfg, Some(data_dir.as_path()));
    let agent = Arc::new(Mutex::new(agent));

    // ── Shared shutdown flag + Ctrl-C handler ─────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        let agent = agent.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "Ctrl-C received; stopping the agent.".yellow().bold());
            agent.lock().unwrap().emergency_stop();
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    // ── Fixed-rate cycle clock ────────────────────────────────────────────
    {
        let agent = agent.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CYCLE);
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let mut agent = agent.lock().unwrap();
                agent.update();
                // Let the simulated avatar drift with its commanded velocity.
                agent.link_mut().advance(CYCLE.as_secs_f64());
            }
        });
    }

    println!();
    println!(
        "  Demo world ready. Type {} for commands, {} to start the agent.\n",
        "help".bold().cyan(),
        "toggle".bold().cyan()
    );

    // ── Interactive REPL (blocking stdin loop) ────────────────────────────
    let repl_shutdown = shutdown.clone();
    let repl_handle =
        tokio::task::spawn_blocking(move || repl::run(agent, repl_shutdown));
    let _ = repl_handle.await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"       _       _ _ "#.bold().cyan());
    println!("{}", r#"__   _(_) __ _(_) |"#.bold().cyan());
    println!("{}", r#"\ \ / / |/ _` | | |"#.bold().cyan());
    println!("{}", r#" \ V /| | (_| | | |"#.bold().cyan());
    println!("{}", r#"  \_/ |_|\__, |_|_|"#.bold().cyan());
    println!("{}", r#"         |___/     "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Vigil".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Unattended survival agent");
    println!();
}
