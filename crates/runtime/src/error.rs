use std::time::Duration;

use thiserror::Error;

use crate::llm::ModelError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    #[error("model requested unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool {name} is exposed by both {first} and {second}")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },

    #[error("tool name {name} is longer than {max} characters")]
    ToolNameTooLong { name: String, max: usize },

    #[error("turn limit of {0} exceeded")]
    TurnLimitExceeded(usize),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
