use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use apguard::config::Config;
use apguard::radio::RecordingRadio;
use apguard::scenario::{replay, Scenario};
use apguard::{AdmissionGate, Daemon, ManualClock};

/// Replays start here so the first window is not anchored at zero
const SIMULATION_START_MS: u64 = 10_000;

#[derive(Parser)]
#[command(name = "apguard")]
#[command(author, version, about = "Flood detection and mitigation for a Wi-Fi access point")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the TCP message server with flood protection
    Run,

    /// Replay a synthetic traffic scenario against the detectors
    Simulate {
        /// Traffic pattern to generate
        #[arg(value_enum)]
        scenario: Scenario,

        /// Seed for generated addresses and timing
        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Load the configuration named on the command line, or the default one
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default().context("Failed to load configuration")?,
    };
    Ok(config)
}

pub async fn run_command(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run => cmd_run(config).await,
        Commands::Simulate { scenario, seed } => cmd_simulate(config, scenario, seed),
        Commands::Config { output } => cmd_config(&config, output),
    }
}

async fn cmd_run(config: Config) -> Result<()> {
    println!("Starting apguard on {}...", config.server.listen_addr());

    let daemon = Daemon::new(config);
    let shutdown = daemon.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nShutting down...");
            let _ = shutdown.send(()).await;
        }
    });

    daemon.run().await
}

fn cmd_simulate(config: Config, scenario: Scenario, seed: u64) -> Result<()> {
    let clock = ManualClock::new(SIMULATION_START_MS);
    let radio = Arc::new(RecordingRadio::new());
    let gate = AdmissionGate::new(&config, radio.clone(), Arc::new(clock.clone()));

    let stimuli = scenario.generate(seed);
    let span = stimuli.last().map(|s| s.at_ms).unwrap_or(0);
    println!(
        "Replaying {:?}: {} events over {} ms (seed {})",
        scenario,
        stimuli.len(),
        span,
        seed
    );

    let summary = replay(&gate, &clock, &stimuli);

    println!();
    println!("Associations accepted:     {}", summary.associations_accepted);
    println!("Associations blacklisted:  {}", summary.associations_blacklisted);
    println!("Associations flooded:      {}", summary.associations_flooded);
    println!("Disassociations:           {}", summary.disassociations);
    println!("  flood detections:        {}", summary.disassoc_floods);
    println!("  duplicates:              {}", summary.duplicate_disassociations);
    println!("Echo replies:              {}", summary.echo_replies);
    println!("Blocked replies:           {}", summary.blocked_replies);

    let commands = radio.take();
    if !commands.is_empty() {
        println!();
        println!("Forced disassociations:");
        for target in &commands {
            println!("  {}", target);
        }
    }

    let banned = gate.blacklisted();
    if !banned.is_empty() {
        println!();
        println!("Blacklist:");
        for (address, kind) in &banned {
            println!("  {}  {}", address, kind);
        }
    }

    let report = gate.report();
    println!();
    println!(
        "Threat level: {:?} ({})",
        report.threat_level,
        report.threat_level.description()
    );
    report.log();

    Ok(())
}

fn cmd_config(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let toml_str = config.to_toml()?;

    match output {
        Some(path) => {
            std::fs::write(&path, &toml_str)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml_str);
        }
    }

    Ok(())
}
