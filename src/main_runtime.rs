use hashbot::adapters::{build_sources, Welcome};
use hashbot::config::{AppConfig, LoggingConfig};
use hashbot::error::{HashBotError, Result};
use hashbot::{Dispatcher, Refresher, Snapshot};
use std::sync::Arc;
use tokio::signal;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Load and check configuration; anything wrong here stops the process
pub fn load_config(dir: &str) -> Result<AppConfig> {
    let config = AppConfig::load_from(dir)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("\x1b[31m✗ {e}\x1b[0m");
        }
        return Err(HashBotError::Validation(errors.join("; ")));
    }
    Ok(config)
}

/// Build the shared snapshot with its refresher and dispatcher
pub fn build_core(config: &AppConfig) -> Result<(Refresher, Arc<Dispatcher>)> {
    let snapshot = Arc::new(Snapshot::new());
    let sources = build_sources(&config.sources, config.refresh.request_timeout())?;
    let refresher = Refresher::new(sources, Arc::clone(&snapshot));
    let dispatcher = Arc::new(Dispatcher::new(snapshot, config.deployment.clone()));
    Ok((refresher, dispatcher))
}

pub fn welcome(config: &AppConfig) -> Option<Welcome> {
    config.discord.welcome_channel_id.map(|channel_id| Welcome {
        channel_id,
        template: config.discord.welcome_message.clone(),
    })
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},serenity=warn,tracing::span=warn", logging.level))
    });

    // File logging only when HASHBOT_LOG_DIR is set and writable.
    //
    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so writability is checked first.
    let file_layer = std::env::var("HASHBOT_LOG_DIR").ok().and_then(|log_dir| {
        if std::fs::create_dir_all(&log_dir).is_err() {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                log_dir
            );
            return None;
        }

        let test_path = std::path::Path::new(&log_dir).join(".hashbot_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&log_dir, "hashbot.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                eprintln!("Logging to: {}/hashbot.log", log_dir);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let console_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
