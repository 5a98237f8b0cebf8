//! REPL – interactive shell driving the agent and the perimeter commands.
//!
//! Supported commands:
//!   help             – show this list
//!   toggle           – enable/disable the agent
//!   status           – agent state, patterns, perimeter, pending tasks
//!   start-perimeter  – begin recording the base perimeter
//!   add-point        – record the avatar's position as a perimeter point
//!   finish-perimeter – derive and persist the bounding box
//!   mark-chest       – authorize the chest nearest the avatar
//!   quit | exit      – leave

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use colored::Colorize;
use vigil_agent::Agent;
use vigil_world::{SimLink, WorldLink};

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(agent: Arc<Mutex<Agent<SimLink>>>, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "vigil>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        match cmd {
            "help" => cmd_help(),
            "toggle" => cmd_toggle(&agent),
            "status" => cmd_status(&agent),
            "start-perimeter" => {
                agent.lock().unwrap().start_perimeter();
                println!("{}", "Perimeter recording started. Walk the base!".green());
            }
            "add-point" => cmd_add_point(&agent),
            "finish-perimeter" => cmd_finish_perimeter(&agent),
            "mark-chest" => cmd_mark_chest(&agent),
            "quit" | "exit" => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Vigil Commands".bold().underline());
    println!("  {}           – enable/disable the agent", "toggle".bold().cyan());
    println!("  {}           – agent state and stores", "status".bold().cyan());
    println!("  {}  – begin perimeter recording", "start-perimeter".bold().cyan());
    println!("  {}        – record current position", "add-point".bold().cyan());
    println!("  {} – derive and persist the box", "finish-perimeter".bold().cyan());
    println!("  {}       – authorize the nearest chest", "mark-chest".bold().cyan());
    println!("  {}        – leave", "quit  exit".bold().cyan());
    println!();
}

fn cmd_toggle(agent: &Arc<Mutex<Agent<SimLink>>>) {
    let mut agent = agent.lock().unwrap();
    if agent.toggle() {
        println!("{}", "Agent enabled.".green().bold());
    } else {
        println!(
            "{} (learning idle motion, {} pattern(s) so far)",
            "Agent disabled.".yellow().bold(),
            agent.pattern_count()
        );
    }
}

fn cmd_status(agent: &Arc<Mutex<Agent<SimLink>>>) {
    let agent = agent.lock().unwrap();
    let state = if agent.is_enabled() {
        "enabled".green().bold()
    } else {
        "disabled".yellow().bold()
    };
    let pos = agent.link().position();
    println!();
    println!("  state     : {}", state);
    println!("  learning  : {}", agent.is_learning());
    println!("  position  : ({:.1}, {:.1}, {:.1})", pos.x, pos.y, pos.z);
    println!("  tasks     : {} pending", agent.pending_tasks());
    match agent.patterns().latest_recorded_at() {
        Some(at) => println!(
            "  patterns  : {} (newest {})",
            agent.pattern_count(),
            at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("  patterns  : 0"),
    }
    match agent.perimeter().bounds() {
        Some((min, max)) => println!(
            "  perimeter : ({}, {}, {}) to ({}, {}, {})",
            min.x, min.y, min.z, max.x, max.y, max.z
        ),
        None => println!("  perimeter : not recorded"),
    }
    println!();
}

fn cmd_add_point(agent: &Arc<Mutex<Agent<SimLink>>>) {
    match agent.lock().unwrap().add_perimeter_point() {
        Some(count) => println!("{} {} recorded", "Point".yellow(), count),
        None => println!(
            "{}",
            "No recording in progress. Run start-perimeter first.".red()
        ),
    }
}

fn cmd_finish_perimeter(agent: &Arc<Mutex<Agent<SimLink>>>) {
    match agent.lock().unwrap().finish_perimeter() {
        Some((min, max)) => println!(
            "{} bounds ({}, {}, {}) to ({}, {}, {})",
            "Perimeter recorded!".green().bold(),
            min.x, min.y, min.z, max.x, max.y, max.z
        ),
        None => println!("{}", "No points recorded; perimeter unchanged.".red()),
    }
}

fn cmd_mark_chest(agent: &Arc<Mutex<Agent<SimLink>>>) {
    match agent.lock().unwrap().mark_nearby_chest() {
        Some(pos) => println!(
            "{} at ({}, {}, {})",
            "Chest authorized".green(),
            pos.x, pos.y, pos.z
        ),
        None => println!("{}", "No chest found nearby.".red()),
    }
}
