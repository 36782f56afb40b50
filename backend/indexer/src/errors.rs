//! Indexer error type shared by the RPC poller, the database layer and the API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The RPC rejected the request itself; retrying will not help.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The RPC answered, but not in a shape we can use.
    #[error("Malformed RPC response: {0}")]
    Decode(String),

    #[error("Campaign {0} not found")]
    CampaignNotFound(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
