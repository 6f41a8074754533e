//! Connection establishment with transport fallback.

use std::future::Future;

use reqwest::Url;
use rmcp::ServiceExt;
use rmcp::transport::{
    ConfigureCommandExt, SseClientTransport, StreamableHttpClientTransport, TokioChildProcess,
};
use tokio::process::Command;
use tracing::{info, warn};

use crate::descriptor::{Endpoint, ProcessCommand, ServerDescriptor, TransportKind};
use crate::error::{Error, Result};
use crate::session::{McpSession, ToolSession};

/// Opens sessions over each of the supported transports.
///
/// The fallback policy lives in [`establish`]; a connector only knows how to
/// make a single attempt.
pub trait Connector: Send + Sync {
    type Session: ToolSession;

    fn spawn_process(
        &self,
        server: &str,
        command: &ProcessCommand,
    ) -> impl Future<Output = Result<Self::Session>> + Send;

    fn connect_streamable(
        &self,
        server: &str,
        url: &Url,
    ) -> impl Future<Output = Result<Self::Session>> + Send;

    fn connect_sse(
        &self,
        server: &str,
        url: &Url,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Connect to one server.
///
/// Remote endpoints try streamable HTTP first and fall back to SSE once.
/// Process endpoints have no fallback.
pub async fn establish<C: Connector>(
    connector: &C,
    descriptor: &ServerDescriptor,
) -> Result<C::Session> {
    let server = descriptor.name.as_str();
    let session = match &descriptor.endpoint {
        Endpoint::Process(command) => connector.spawn_process(server, command).await?,
        Endpoint::Remote(url) => match connector.connect_streamable(server, url).await {
            Ok(session) => session,
            Err(e) => {
                warn!(server, %url, error = %e, "streamable HTTP failed, falling back to SSE");
                connector.connect_sse(server, url).await?
            }
        },
    };

    info!(server, transport = %session.transport(), "connected");
    Ok(session)
}

/// Connect to every server, one at a time, in descriptor order.
///
/// On failure the sessions opened so far are closed before the error is
/// returned.
pub async fn connect_all<C: Connector>(
    connector: &C,
    descriptors: &[ServerDescriptor],
) -> Result<Vec<C::Session>> {
    let mut sessions = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        match establish(connector, descriptor).await {
            Ok(session) => sessions.push(session),
            Err(e) => {
                for session in &sessions {
                    session.close().await;
                }
                return Err(e);
            }
        }
    }
    Ok(sessions)
}

/// Connector backed by the rmcp client transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpConnector;

impl McpConnector {
    fn connect_error(server: &str, transport: TransportKind, reason: impl ToString) -> Error {
        Error::Connect {
            server: server.to_string(),
            transport,
            reason: reason.to_string(),
        }
    }
}

impl Connector for McpConnector {
    type Session = McpSession;

    async fn spawn_process(&self, server: &str, command: &ProcessCommand) -> Result<McpSession> {
        let transport = TokioChildProcess::new(Command::new(&command.command).configure(|cmd| {
            cmd.args(&command.args).envs(&command.env);
        }))
        .map_err(|source| Error::Spawn {
            server: server.to_string(),
            source,
        })?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Self::connect_error(server, TransportKind::ProcessPipe, e))?;

        Ok(McpSession::new(server, TransportKind::ProcessPipe, service))
    }

    async fn connect_streamable(&self, server: &str, url: &Url) -> Result<McpSession> {
        let transport = StreamableHttpClientTransport::from_uri(url.as_str());

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Self::connect_error(server, TransportKind::StreamableHttp, e))?;

        Ok(McpSession::new(server, TransportKind::StreamableHttp, service))
    }

    async fn connect_sse(&self, server: &str, url: &Url) -> Result<McpSession> {
        let transport = SseClientTransport::start(url.as_str())
            .await
            .map_err(|e| Self::connect_error(server, TransportKind::Sse, e))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Self::connect_error(server, TransportKind::Sse, e))?;

        Ok(McpSession::new(server, TransportKind::Sse, service))
    }
}
