//! Multi-signature ledger simulator CLI
//!
//! Runs a scripted scenario against an in-process ledger and prints the
//! resulting projection.

use anyhow::Context;
use clap::{Parser, Subcommand};
use multisig_node::{run_scenario, Scenario};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multisig-sim")]
#[command(about = "Simulate a multi-signature approval ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the final projection as JSON
    Run {
        /// Scenario file (node config plus [[steps]])
        #[arg(short, long)]
        config: PathBuf,

        /// Print the full report (step outcomes and counters) instead of
        /// just the projection
        #[arg(long)]
        report: bool,

        /// Override the identity poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Validate a config or scenario file without running anything
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            report,
            poll_interval_ms,
        } => {
            let mut scenario = Scenario::from_file(&config)
                .with_context(|| format!("loading scenario {}", config.display()))?;
            if let Some(ms) = poll_interval_ms {
                scenario.node.runtime.poll_interval_ms = ms;
            }

            let result = run_scenario(&scenario).await.context("running scenario")?;
            let json = if report {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string_pretty(&result.projection)?
            };
            println!("{json}");

            let rejected = result.rejected().count();
            if rejected > 0 {
                eprintln!("{rejected} step(s) rejected by the ledger");
            }
        }

        Commands::Check { config } => {
            let scenario = Scenario::from_file(&config)
                .with_context(|| format!("validating {}", config.display()))?;
            println!(
                "ok: {} owners, threshold {}, {} steps",
                scenario.node.ledger.owners.len(),
                scenario.node.ledger.threshold,
                scenario.steps.len()
            );
        }
    }

    Ok(())
}
