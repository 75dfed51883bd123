use clap::{Parser, Subcommand};
use std::io::{stdout, Write};

use crate::adapters::{ChatTransport, InboundMessage};
use crate::domain::{format_with_thousands, Slot, SnapshotView};
use crate::error::Result;
use crate::services::{CycleReport, Dispatcher};

#[derive(Parser)]
#[command(name = "hashbot")]
#[command(author = "HashBot Developers")]
#[command(version)]
#[command(about = "Discord bot for blockchain network and price stats", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory
    #[arg(short, long, default_value = "config", env = "HASHBOT_CONFIG_DIR")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run,
    /// Fetch every source once and report what came back
    Check,
    /// Fetch every source once and answer a command on stdout
    Ask {
        /// Command text, e.g. "!network"
        text: String,
    },
}

/// Print the outcome of one refresh cycle
pub fn print_check(report: &CycleReport, view: &SnapshotView) -> Result<()> {
    let mut out = stdout().lock();
    writeln!(out, "Checking data sources...\n")?;

    for slot in Slot::ALL {
        let status = if report.updated.contains(&slot) {
            "\x1b[32mOK\x1b[0m"
        } else if report.failed.contains(&slot) {
            "\x1b[31mFAILED\x1b[0m"
        } else {
            "\x1b[33mNOT CONFIGURED\x1b[0m"
        };
        writeln!(out, "  {:<16} {}", slot.as_str(), status)?;

        if let Some(stored) = view.stored(slot) {
            writeln!(out, "    fetched at {}", stored.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
    }

    if let Some(network) = view.network() {
        if let Some(height) = network.height {
            writeln!(out, "\n  Height: {}", format_with_thousands(height))?;
        }
    }
    if let Some(tx) = view.transactions() {
        if let Some(total) = tx.already_generated_transactions {
            writeln!(out, "  Total transactions: {}", format_with_thousands(total))?;
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Dispatch `text` as if it came from chat; prints a note if nothing is sent
pub async fn ask(dispatcher: &Dispatcher, transport: &dyn ChatTransport, text: &str) -> Result<()> {
    let message = InboundMessage {
        sender_id: 0,
        channel_id: 0,
        message_id: 0,
        text: text.to_string(),
    };

    if !dispatcher.dispatch(transport, &message).await {
        println!("(no reply: not a recognised command)");
    }
    Ok(())
}
