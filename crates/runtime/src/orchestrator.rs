//! The agent loop: ask the model, dispatch its tool calls, repeat.

use std::future::Future;
use std::time::Duration;

use mcp::{JsonObject, ToolSession};
use tracing::{debug, info, warn};

use crate::backend::{Backend, CompletionRequest};
use crate::catalog::{RoutingTable, ToolCatalog};
use crate::llm::{Message, ToolCallRequest};
use crate::normalize::{Turn, normalize};
use crate::{Error, Result};

/// Limits applied to a query.
///
/// Everything is off by default, which lets the loop run until the model
/// stops asking for tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum number of model requests per query.
    pub max_turns: Option<usize>,
    /// Bound on one completion request, including reading its stream.
    pub turn_timeout: Option<Duration>,
    /// Bound on one tool invocation.
    pub tool_timeout: Option<Duration>,
}

/// Drives conversations against a fixed catalog.
pub struct Orchestrator<B, S> {
    backend: B,
    catalog: ToolCatalog,
    routes: RoutingTable<S>,
    config: OrchestratorConfig,
}

impl<B: Backend, S: ToolSession> Orchestrator<B, S> {
    pub fn new(backend: B, catalog: ToolCatalog, routes: RoutingTable<S>) -> Self {
        Self {
            backend,
            catalog,
            routes,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run one query to completion and return the whole transcript.
    ///
    /// Tool calls are dispatched one at a time in the order the model
    /// requested them; each result is appended as soon as it arrives.
    pub async fn process_query(&self, query: &str) -> Result<Vec<Message>> {
        let mut transcript = vec![Message::user(query)];
        let mut turns = 0;

        loop {
            if let Some(limit) = self.config.max_turns {
                if turns >= limit {
                    return Err(Error::TurnLimitExceeded(limit));
                }
            }
            turns += 1;

            let Turn {
                message,
                tool_calls,
            } = self.ask(&transcript).await?;
            transcript.push(message);

            if tool_calls.is_empty() {
                info!(turns, messages = transcript.len(), "query finished");
                return Ok(transcript);
            }

            debug!(turn = turns, calls = tool_calls.len(), "dispatching tool calls");
            for call in &tool_calls {
                let result = self.dispatch(call).await?;
                transcript.push(result);
            }
        }
    }

    async fn ask(&self, transcript: &[Message]) -> Result<Turn> {
        let request = CompletionRequest {
            messages: transcript,
            tools: self.catalog.specs(),
        };

        within(self.config.turn_timeout, || "model turn".to_string(), async {
            let completion = self.backend.complete(request).await?;
            Ok::<_, Error>(normalize(completion).await?)
        })
        .await
    }

    async fn dispatch(&self, call: &ToolCallRequest) -> Result<Message> {
        let arguments = parse_arguments(call);
        let route = self
            .routes
            .resolve(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        debug!(
            tool = %call.name,
            server = route.session.server(),
            call_id = %call.id,
            "calling tool"
        );

        let result = within(
            self.config.tool_timeout,
            || format!("tool {}", call.name),
            async {
                Ok::<_, Error>(route
                    .session
                    .call_tool(&route.remote_name, arguments)
                    .await?)
            },
        )
        .await?;

        let content = serde_json::to_string(&result)?;
        Ok(Message::tool(&call.id, content))
    }
}

/// Decode the model's argument text, falling back to no arguments.
fn parse_arguments(call: &ToolCallRequest) -> JsonObject {
    match serde_json::from_str::<JsonObject>(&call.raw_arguments) {
        Ok(arguments) => arguments,
        Err(e) => {
            warn!(
                tool = %call.name,
                call_id = %call.id,
                raw = %call.raw_arguments,
                error = %e,
                "malformed tool arguments, calling with none"
            );
            JsonObject::new()
        }
    }
}

async fn within<T>(
    limit: Option<Duration>,
    operation: impl FnOnce() -> String,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| Error::Timeout {
                operation: operation(),
                after,
            })?,
        None => fut.await,
    }
}
