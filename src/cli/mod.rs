//! Command-line interface.

mod common;
mod heartbeat;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "heartwire")]
#[command(about = "Proactive heartbeat scheduler for chat assistants", long_about = None)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.heartwire/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single heartbeat now and print the outcome
    Once {
        /// Reason recorded with the run
        #[arg(short, long, default_value = "manual")]
        reason: String,
    },
    /// Run the heartbeat scheduler until Ctrl+C
    Start {
        /// Request a heartbeat right after startup
        #[arg(long)]
        wake_now: bool,
    },
    /// Show where a heartbeat would be delivered
    Target,
    /// Show version information
    Version,
}

impl Cli {
    pub(crate) fn json_logs(&self) -> bool {
        self.json_logs
    }
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Version) | None => {
            println!("heartwire {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Once { reason }) => heartbeat::cmd_once(cli.config, reason).await,
        Some(Commands::Start { wake_now }) => heartbeat::cmd_start(cli.config, wake_now).await,
        Some(Commands::Target) => heartbeat::cmd_target(cli.config).await,
    }
}
