use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::domain::{HashrateSource, Slot};
use crate::error::{HashBotError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token
    #[serde(default)]
    pub token: String,
    /// Channel that receives welcome messages for new members
    #[serde(default)]
    pub welcome_channel_id: Option<u64>,
    /// Welcome template; `{member}` is replaced with a mention
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

fn default_welcome_message() -> String {
    "Hey {member}, welcome!".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Time between refresh cycles in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// One upstream endpoint feeding one snapshot slot
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub slot: Slot,
    pub url: String,
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            slot: Slot::Network,
            url: "http://127.0.0.1:11898/getinfo".to_string(),
        },
        SourceConfig {
            slot: Slot::Transactions,
            url: "http://127.0.0.1:8080/block/header/top".to_string(),
        },
        SourceConfig {
            slot: Slot::Price,
            url: "https://tradeogre.com/api/v1/ticker/BTC-TRTL".to_string(),
        },
        SourceConfig {
            slot: Slot::ReferenceAsset,
            url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd"
                .to_string(),
        },
    ]
}

/// Per-deployment constants used when rendering replies
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default = "default_coin_name")]
    pub coin_name: String,
    #[serde(default = "default_ticker")]
    pub ticker: String,
    /// Decimal places of the atomic unit
    #[serde(default = "default_coin_decimals")]
    pub coin_decimals: u32,
    /// Maximum supply in atomic units
    #[serde(default = "default_total_supply")]
    pub total_supply: Decimal,
    #[serde(default)]
    pub hashrate_source: HashrateSource,
    #[serde(default = "default_block_target_secs")]
    pub block_target_secs: u64,
    /// Ticker of the asset prices are quoted in
    #[serde(default = "default_reference_ticker")]
    pub reference_ticker: String,
    #[serde(default = "default_fiat_symbol")]
    pub fiat_symbol: String,
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_footer")]
    pub footer: String,
}

fn default_coin_name() -> String {
    "TurtleCoin".to_string()
}

fn default_ticker() -> String {
    "TRTL".to_string()
}

fn default_coin_decimals() -> u32 {
    2
}

fn default_total_supply() -> Decimal {
    Decimal::from(100_000_000_000_000u64)
}

fn default_block_target_secs() -> u64 {
    120
}

fn default_reference_ticker() -> String {
    "BTC".to_string()
}

fn default_fiat_symbol() -> String {
    "$".to_string()
}

fn default_embed_color() -> u32 {
    3_066_993
}

fn default_footer() -> String {
    "HashBot".to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            coin_name: default_coin_name(),
            ticker: default_ticker(),
            coin_decimals: default_coin_decimals(),
            total_supply: default_total_supply(),
            hashrate_source: HashrateSource::default(),
            block_target_secs: default_block_target_secs(),
            reference_ticker: default_reference_ticker(),
            fiat_symbol: default_fiat_symbol(),
            embed_color: default_embed_color(),
            thumbnail_url: None,
            footer: default_footer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("refresh.interval_ms", default_interval_ms())?
            .set_default("refresh.request_timeout_ms", default_request_timeout_ms())?
            .set_default("discord.token", "")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HASHBOT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HASHBOT_DISCORD__TOKEN, etc.)
            .add_source(
                Environment::with_prefix("HASHBOT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration with defaults and the given token, for CLI usage and tests
    pub fn default_config(token: &str) -> Self {
        Self {
            discord: DiscordConfig {
                token: token.to_string(),
                welcome_channel_id: None,
                welcome_message: default_welcome_message(),
            },
            refresh: RefreshConfig::default(),
            sources: default_sources(),
            deployment: DeploymentConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                json: false,
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.refresh.interval_ms == 0 {
            errors.push("refresh.interval_ms must be positive".to_string());
        }

        if self.refresh.request_timeout_ms == 0 {
            errors.push("refresh.request_timeout_ms must be positive".to_string());
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.slot) {
                errors.push(format!("slot {} is configured more than once", source.slot));
            }
            match Url::parse(&source.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "source {} uses unsupported scheme {}",
                    source.slot,
                    url.scheme()
                )),
                Err(e) => errors.push(format!("source {} has invalid url: {e}", source.slot)),
            }
        }

        if self.deployment.total_supply <= Decimal::ZERO {
            errors.push("deployment.total_supply must be positive".to_string());
        }

        if self.deployment.block_target_secs == 0 {
            errors.push("deployment.block_target_secs must be positive".to_string());
        }

        if self.deployment.coin_decimals > 18 {
            errors.push("deployment.coin_decimals must be at most 18".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate everything the bot needs before entering the refresh/dispatch loop.
    ///
    /// A missing token is reported as a missing secret; everything else as a
    /// validation failure.
    pub fn ensure_runnable(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            return Err(HashBotError::MissingSecret(
                "discord.token (set HASHBOT_DISCORD__TOKEN)".to_string(),
            ));
        }

        self.validate()
            .map_err(|errors| HashBotError::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default_config("token");
        assert!(cfg.validate().is_ok());
        assert!(cfg.ensure_runnable().is_ok());
        assert_eq!(cfg.refresh.interval(), Duration::from_secs(5));
        assert_eq!(cfg.refresh.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let cfg = AppConfig::default_config("   ");
        let err = cfg.ensure_runnable().unwrap_err();
        assert!(matches!(err, HashBotError::MissingSecret(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut cfg = AppConfig::default_config("token");
        cfg.refresh.interval_ms = 0;
        cfg.deployment.total_supply = Decimal::ZERO;
        cfg.sources.push(SourceConfig {
            slot: Slot::Network,
            url: "ftp://example.com/getinfo".to_string(),
        });

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("more than once")));
        assert!(errors.iter().any(|e| e.contains("unsupported scheme")));
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let cfg = AppConfig::load_from("/nonexistent/hashbot-config").unwrap();
        assert_eq!(cfg.refresh.interval_ms, 5000);
        assert_eq!(cfg.sources.len(), 4);
        assert_eq!(cfg.deployment.hashrate_source, HashrateSource::Difficulty);
    }
}
