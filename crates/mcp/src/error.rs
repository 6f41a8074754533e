//! MCP error types.

use thiserror::Error;

use crate::descriptor::TransportKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server {server}: {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {server} over {transport}: {reason}")]
    Connect {
        server: String,
        transport: TransportKind,
        reason: String,
    },

    #[error("failed to list tools of {server}: {reason}")]
    ListTools { server: String, reason: String },

    #[error("tool call {tool} on {server} failed: {reason}")]
    CallTool {
        server: String,
        tool: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
