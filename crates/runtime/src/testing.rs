//! In-memory sessions and backends for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use mcp::{JsonObject, ToolDescriptor, ToolResult, ToolSession, TransportKind};
use serde_json::json;

use crate::backend::{AssistantReply, Backend, Completion, CompletionRequest};
use crate::llm::{Message, ModelError};

/// Shared, ordered record of what happened across sessions.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub(crate) struct StubSession {
    server: String,
    tools: Vec<ToolDescriptor>,
    fail_list: bool,
    fail_calls: bool,
    error_results: bool,
    delay: Duration,
    journal: Journal,
    calls: Mutex<Vec<(String, JsonObject)>>,
}

impl StubSession {
    pub(crate) fn new(server: &str, tools: &[&str]) -> Self {
        Self {
            server: server.to_string(),
            tools: tools
                .iter()
                .map(|name| ToolDescriptor {
                    name: name.to_string(),
                    description: format!("{name} tool"),
                    input_schema: json!({"type": "object"}),
                })
                .collect(),
            fail_list: false,
            fail_calls: false,
            error_results: false,
            delay: Duration::ZERO,
            journal: Journal::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub(crate) fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Calls succeed at the protocol level but report `isError`.
    pub(crate) fn erroring_results(mut self) -> Self {
        self.error_results = true;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Arc::clone(journal);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, JsonObject)> {
        self.calls.lock().unwrap().clone()
    }

    fn note(&self, event: String) {
        self.journal.lock().unwrap().push(event);
    }
}

impl ToolSession for StubSession {
    fn server(&self) -> &str {
        &self.server
    }

    fn transport(&self) -> TransportKind {
        TransportKind::ProcessPipe
    }

    async fn list_tools(&self) -> mcp::Result<Vec<ToolDescriptor>> {
        if self.fail_list {
            return Err(mcp::Error::ListTools {
                server: self.server.clone(),
                reason: "stub refused".into(),
            });
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> mcp::Result<ToolResult> {
        self.note(format!("start {}:{name}", self.server));
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.note(format!("end {}:{name}", self.server));

        if self.fail_calls {
            return Err(mcp::Error::CallTool {
                server: self.server.clone(),
                tool: name.to_string(),
                reason: "stub failure".into(),
            });
        }
        let result = ToolResult::text([format!("{}:{name}", self.server)]);
        Ok(if self.error_results {
            result.into_error()
        } else {
            result
        })
    }

    async fn close(&self) {
        self.note(format!("close {}", self.server));
    }
}

type Script = Box<dyn Fn(usize) -> Completion + Send + Sync>;

/// Backend answering each turn from a script indexed by turn number.
pub(crate) struct ScriptedBackend {
    script: Script,
    delay: Duration,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(script: impl Fn(usize) -> Completion + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Play the replies in order; fail once they run out.
    pub(crate) fn replies(replies: Vec<AssistantReply>) -> Self {
        Self::new(move |turn| match replies.get(turn) {
            Some(reply) => Completion::Complete(reply.clone()),
            None => Completion::Streamed(
                futures::stream::once(async { Err(ModelError::Api("script exhausted".into())) })
                    .boxed(),
            ),
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Transcript snapshots, one per request.
    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        let turn = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.messages.to_vec());
            requests.len() - 1
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok((self.script)(turn))
    }
}
