//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No API key in the config file or the environment.
    #[error("no API key: set OPENAI_API_KEY or model.api_key")]
    MissingApiKey,

    /// The agent loop failed.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// A tool server could not be reached.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
