//! Switchboard runtime: the model side of the agent loop.
//!
//! This crate turns a set of connected tool sessions into a single tool
//! catalog, talks to an OpenAI-compatible chat-completions endpoint, and
//! runs the loop that feeds tool results back to the model until it
//! answers in plain text.
//!
//! # Overview
//!
//! - **Backend**: a trait over completion providers. A turn comes back
//!   either complete or as a stream of chunks.
//! - **normalize**: folds either shape into one assistant message plus
//!   its tool calls.
//! - **Catalog**: the flattened tool list the model sees, and the routing
//!   table that maps each name back to its session.
//! - **Orchestrator**: runs one query to completion.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mcp::{Connector, McpConnector, ProcessCommand, ServerDescriptor};
//! use runtime::{DuplicatePolicy, OpenAiBackend, Orchestrator, build_catalog};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let servers = [ServerDescriptor::process(
//!     "time",
//!     ProcessCommand::new("uvx").arg("mcp-server-time"),
//! )];
//! let sessions: Vec<_> = mcp::connect_all(&McpConnector, &servers)
//!     .await?
//!     .into_iter()
//!     .map(Arc::new)
//!     .collect();
//! let (catalog, routes) = build_catalog(&sessions, DuplicatePolicy::Override).await?;
//!
//! let backend = OpenAiBackend::builder("sk-...", "qwen-plus").build();
//! let agent = Orchestrator::new(backend, catalog, routes);
//! let transcript = agent.process_query("What time is it in Shanghai?").await?;
//! println!("{}", transcript.last().map(|m| m.content.as_str()).unwrap_or(""));
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod catalog;
mod error;
pub mod llm;
mod normalize;
mod orchestrator;

#[cfg(test)]
mod testing;

pub use backend::{
    AssistantReply, Backend, ChunkStream, Completion, CompletionChunk, CompletionRequest,
    DEFAULT_BASE_URL, OpenAiBackend, OpenAiBackendBuilder, ToolCallDelta,
};
pub use catalog::{
    DuplicatePolicy, MAX_TOOL_NAME_LEN, NAMESPACE_SEPARATOR, Route, RoutingTable, ToolCatalog,
    build_catalog,
};
pub use error::{Error, Result};
pub use llm::{Message, ModelError, Role, ToolCallRequest, ToolSpec};
pub use normalize::{Turn, normalize};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
