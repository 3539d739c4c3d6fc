//! CLI for planning and dry-running sanctum runs.
//!
//! The live deployment embeds [`gauntlet::run::execute_run`] behind its own
//! collaborators; this binary exercises the same engine against the scripted
//! world, which is how timeout and attempt budgets get tuned.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use gauntlet::config::{RunConfig, load_config, write_config};
use gauntlet::core::phases::{
    Capabilities, GuardianSpec, Phase, RunMode, RunParameters, objective_graph, terminal_guardian,
};
use gauntlet::exit_codes;
use gauntlet::journal::RunJournal;
use gauntlet::pause::PauseGate;
use gauntlet::run::execute_run;
use gauntlet::sim::{SimHandle, SimWorld};

#[derive(Parser)]
#[command(name = "gauntlet", version, about = "Autonomous sanctum-run orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the objective graph as JSON.
    Plan,
    /// Validate the run configuration.
    Check {
        /// Path to the config TOML.
        #[arg(long, default_value = "gauntlet.toml")]
        config: PathBuf,
        /// Write a default config file if it is missing.
        #[arg(long)]
        init: bool,
    },
    /// Execute a full run against a scripted world and print journal events.
    Simulate {
        /// Path to the scenario script (JSON).
        #[arg(long)]
        script: PathBuf,
        /// Path to the config TOML.
        #[arg(long, default_value = "gauntlet.toml")]
        config: PathBuf,
        /// Clear everything along the way instead of objective-only travel.
        #[arg(long)]
        full_clear: bool,
        /// Stage directly at the sanctum center.
        #[arg(long)]
        start_at_center: bool,
        /// Skip the terminal encounter.
        #[arg(long)]
        skip_terminal: bool,
        /// Actor can teleport.
        #[arg(long)]
        can_teleport: bool,
        /// Actor is a leveling build (clears trash while engaging).
        #[arg(long)]
        leveling: bool,
    },
}

fn main() {
    gauntlet::logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Plan => cmd_plan(),
        Command::Check { config, init } => cmd_check(&config, init),
        Command::Simulate {
            script,
            config,
            full_clear,
            start_at_center,
            skip_terminal,
            can_teleport,
            leveling,
        } => {
            let params = RunParameters {
                mode: if full_clear {
                    RunMode::FullClear
                } else {
                    RunMode::ObjectiveOnly
                },
                start_at_center,
                engage_terminal: !skip_terminal,
                capabilities: Capabilities {
                    can_teleport,
                    is_leveling_build: leveling,
                },
            };
            cmd_simulate(&script, &config, &params)
        }
    }
}

#[derive(Serialize)]
struct PlanDoc {
    phases: Vec<Phase>,
    terminal: GuardianSpec,
}

fn cmd_plan() -> Result<i32> {
    let doc = PlanDoc {
        phases: objective_graph(),
        terminal: terminal_guardian(),
    };
    let payload = serde_json::to_string_pretty(&doc).context("serialize plan")?;
    println!("{payload}");
    Ok(exit_codes::OK)
}

fn cmd_check(config: &Path, init: bool) -> Result<i32> {
    if init && !config.exists() {
        write_config(config, &RunConfig::default())?;
        println!("wrote {}", config.display());
    }
    let cfg = load_config(config)?;
    println!(
        "config ok: detection {}s, {} gate attempts, {} engage attempts",
        cfg.detection_timeout_secs, cfg.max_gate_attempts, cfg.max_engage_attempts
    );
    Ok(exit_codes::OK)
}

fn cmd_simulate(script: &Path, config: &Path, params: &RunParameters) -> Result<i32> {
    let cfg = load_config(config)?;
    let contents =
        fs::read_to_string(script).with_context(|| format!("read {}", script.display()))?;
    let mut world = SimHandle::new(SimWorld::from_json(&contents)?);
    let mut pilot = world.clone();
    let gate = PauseGate::new();
    let mut journal = RunJournal::with_capacity(cfg.journal_capacity);

    let result = execute_run(&mut world, &mut pilot, &gate, &mut journal, &cfg, params);

    for event in journal.events() {
        println!("{}", serde_json::to_string(event).context("serialize event")?);
    }
    let counters = world.with(|sim| sim.counters.clone());
    println!(
        "{}",
        serde_json::to_string(&counters).context("serialize counters")?
    );

    match result {
        Ok(summary) => {
            println!(
                "run complete: {} phases, {} guardians confirmed",
                summary.phases_completed, summary.guardians_confirmed
            );
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("run failed: {err:#}");
            Ok(exit_codes::RUN_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan() {
        let cli = Cli::parse_from(["gauntlet", "plan"]);
        assert!(matches!(cli.command, Command::Plan));
    }

    #[test]
    fn parse_check_with_init() {
        let cli = Cli::parse_from(["gauntlet", "check", "--init"]);
        assert!(matches!(cli.command, Command::Check { init: true, .. }));
    }

    #[test]
    fn parse_simulate_flags() {
        let cli = Cli::parse_from([
            "gauntlet",
            "simulate",
            "--script",
            "run.json",
            "--full-clear",
            "--leveling",
        ]);
        match cli.command {
            Command::Simulate {
                full_clear,
                leveling,
                skip_terminal,
                ..
            } => {
                assert!(full_clear);
                assert!(leveling);
                assert!(!skip_terminal);
            }
            _ => panic!("expected simulate"),
        }
    }
}
