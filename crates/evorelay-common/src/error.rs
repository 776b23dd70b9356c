use thiserror::Error;

/// Workspace-wide error type for configuration, storage and provider failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
