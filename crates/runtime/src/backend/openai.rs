//! OpenAI-compatible chat-completions backend.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sse;
use super::{AssistantReply, Backend, Completion, CompletionChunk, CompletionRequest, ToolCallDelta};
use crate::llm::{Message, ModelError, Role, ToolCallRequest, ToolSpec};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
    stream: bool,
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: ApiFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    id: String,
    function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiChunk {
    #[serde(default)]
    choices: Vec<ApiChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChunkChoice {
    delta: Option<ApiDelta>,
}

#[derive(Debug, Deserialize)]
struct ApiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaToolCall {
    id: Option<String>,
    function: Option<ApiDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaFunction {
    name: Option<String>,
    arguments: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    stream: bool,
}

impl OpenAiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            stream: false,
        }
    }

    /// Point the backend at another OpenAI-compatible endpoint.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request streamed responses.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            stream: self.stream,
        }
    }
}

/// OpenAI-compatible backend (OpenAI, DashScope, vLLM, Ollama, ...).
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    stream: bool,
}

impl OpenAiBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(api_key, model)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage<'_> {
        // Providers reject assistant tool-call messages with empty content.
        let content = if msg.content.is_empty() && !msg.tool_calls.is_empty() {
            None
        } else {
            Some(msg.content.as_str())
        };

        ApiMessage {
            role: Self::role_to_api(msg.role),
            content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: &call.id,
                    call_type: "function",
                    function: ApiFunction {
                        name: &call.name,
                        arguments: &call.raw_arguments,
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }

    fn response_to_reply(response: ApiResponse) -> Result<AssistantReply, ModelError> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("response has no choices".into()))?
            .message;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                raw_arguments: call.function.arguments,
            })
            .collect();

        Ok(AssistantReply {
            content: message.content,
            tool_calls,
        })
    }

    /// Only the first choice and its first tool-call fragment are read.
    fn chunk_from_api(data: &str) -> Result<CompletionChunk, ModelError> {
        let chunk: ApiChunk = serde_json::from_str(data)
            .map_err(|e| ModelError::Stream(format!("bad chunk: {e} (data: {data})")))?;

        let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
            return Ok(CompletionChunk::default());
        };

        let tool_call = delta
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .map(|call| {
                let (name, arguments) = call
                    .function
                    .map(|f| (f.name, f.arguments))
                    .unwrap_or_default();
                ToolCallDelta {
                    id: call.id.filter(|id| !id.is_empty()),
                    name,
                    arguments,
                }
            });

        Ok(CompletionChunk {
            content: delta.content,
            tool_call,
        })
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({}, {}, stream={})", self.model, self.base_url, self.stream)
    }
}

impl Backend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools: request.tools,
            stream: self.stream,
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            stream = self.stream,
            "requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        if !self.stream {
            let api_response: ApiResponse = response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
            return Self::response_to_reply(api_response).map(Completion::Complete);
        }

        let chunks = sse::data_events(response.bytes_stream())
            .map(|event| event.and_then(|data| Self::chunk_from_api(&data)))
            .boxed();
        Ok(Completion::Streamed(chunks))
    }
}
