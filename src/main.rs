use clap::Parser;
use hashbot::adapters::{run_gateway, ConsoleTransport};
use hashbot::cli::{self, Cli, Commands};
use hashbot::error::Result;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{build_core, init_logging, init_logging_simple, load_config, shutdown_signal, welcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Run => run_bot(&cli.config).await?,
        Commands::Check => {
            init_logging_simple();
            let config = load_config(&cli.config)?;
            let (refresher, _) = build_core(&config)?;
            let report = refresher.refresh_cycle().await;
            cli::print_check(&report, &refresher.snapshot().view())?;
        }
        Commands::Ask { text } => {
            init_logging_simple();
            let config = load_config(&cli.config)?;
            let (refresher, dispatcher) = build_core(&config)?;
            refresher.refresh_cycle().await;
            cli::ask(&dispatcher, &ConsoleTransport::new(), text).await?;
        }
    }

    Ok(())
}

async fn run_bot(config_dir: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    init_logging(&config.logging);

    // a missing token must stop us before any polling starts
    if let Err(e) = config.ensure_runnable() {
        error!("Cannot start: {}", e);
        return Err(e);
    }

    let (refresher, dispatcher) = build_core(&config)?;
    let refresher = refresher.spawn(config.refresh.interval());
    info!("HashBot started for {}", config.deployment.coin_name);

    let result = tokio::select! {
        r = run_gateway(&config.discord.token, dispatcher, welcome(&config)) => r,
        _ = shutdown_signal() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    refresher.stop().await;
    info!("HashBot stopped");
    result
}
