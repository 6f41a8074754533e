//! MCP (Model Context Protocol) client layer.
//!
//! Connects to tool servers over a process pipe, streamable HTTP or SSE and
//! exposes each connection as a [`ToolSession`].
//!
//! # Example
//!
//! ```no_run
//! use mcp::{McpConnector, ProcessCommand, ServerDescriptor, ToolSession};
//!
//! # async fn example() -> mcp::Result<()> {
//! let descriptor = ServerDescriptor::process(
//!     "calculator",
//!     ProcessCommand::new("python").arg("calculator.py"),
//! );
//!
//! let session = mcp::establish(&McpConnector, &descriptor).await?;
//! for tool in session.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod connect;
mod descriptor;
mod error;
mod protocol;
mod session;

pub use connect::{Connector, McpConnector, connect_all, establish};
pub use descriptor::{Endpoint, ProcessCommand, ServerDescriptor, TransportKind};
pub use error::{Error, Result};
pub use protocol::{JsonObject, ToolDescriptor, ToolResult};
pub use session::{McpSession, ToolSession};

/// Re-exported so callers can build endpoints without naming reqwest.
pub use reqwest::Url;
