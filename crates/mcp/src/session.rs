//! Live sessions with tool servers.

use std::future::Future;

use rmcp::model::CallToolRequestParam;
use rmcp::service::{Peer, RoleClient, RunningService};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::descriptor::TransportKind;
use crate::error::{Error, Result};
use crate::protocol::{JsonObject, ToolDescriptor, ToolResult};

/// A live connection to one tool server.
///
/// This is the boundary between the orchestration loop and the servers:
/// anything that can list and invoke tools can stand in for a real server.
pub trait ToolSession: Send + Sync {
    /// Name of the server this session talks to.
    fn server(&self) -> &str;

    /// Transport the session ended up using.
    fn transport(&self) -> TransportKind;

    /// Ask the server for its tools.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDescriptor>>> + Send;

    /// Invoke one tool and wait for its result.
    fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
    ) -> impl Future<Output = Result<ToolResult>> + Send;

    /// Tear the session down. Further calls fail.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// A session backed by the rmcp client.
pub struct McpSession {
    server: String,
    transport: TransportKind,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl McpSession {
    pub(crate) fn new(
        server: impl Into<String>,
        transport: TransportKind,
        service: RunningService<RoleClient, ()>,
    ) -> Self {
        Self {
            server: server.into(),
            transport,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("server", &self.server)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl ToolSession for McpSession {
    fn server(&self) -> &str {
        &self.server
    }

    fn transport(&self) -> TransportKind {
        self.transport
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| Error::ListTools {
                server: self.server.clone(),
                reason: e.to_string(),
            })?;

        Ok(tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolResult> {
        debug!(server = %self.server, tool = name, "calling tool");

        let params = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| Error::CallTool {
                server: self.server.clone(),
                tool: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult::from(result))
    }

    async fn close(&self) {
        let Some(service) = self.service.lock().await.take() else {
            return;
        };
        if let Err(e) = service.cancel().await {
            warn!(server = %self.server, error = %e, "session did not shut down cleanly");
        }
    }
}
