use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum HashBotError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing secret: {0}")]
    MissingSecret(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream {source_name} returned HTTP {status}")]
    UpstreamStatus { source_name: String, status: u16 },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload from {source_name}: {reason}")]
    InvalidPayload { source_name: String, reason: String },

    // Chat transport errors
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for HashBotError
pub type Result<T> = std::result::Result<T, HashBotError>;

impl HashBotError {
    /// Whether this error stops the process at startup rather than being
    /// absorbed by a refresh cycle or a single dispatch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HashBotError::Config(_) | HashBotError::MissingSecret(_) | HashBotError::Validation(_)
        )
    }
}
