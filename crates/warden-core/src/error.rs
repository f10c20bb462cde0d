use thiserror::Error;

/// Top-level error type for Warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Error from the messaging channel (WhatsApp client).
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistence backend error (SQLite or REST).
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
