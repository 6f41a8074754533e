//! Model-completion backends.
//!
//! A backend answers one turn either with a complete reply or with a lazy
//! stream of incremental chunks. [`crate::normalize`] turns both into the
//! same canonical shape.

mod openai;
mod sse;

pub use openai::{DEFAULT_BASE_URL, OpenAiBackend, OpenAiBackendBuilder};

use std::fmt;
use std::future::Future;

use futures::stream::BoxStream;

use crate::llm::{Message, ModelError, ToolCallRequest, ToolSpec};

/// Everything needed for one completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// Lazy sequence of incremental chunks. Ends when the transport closes it.
pub type ChunkStream = BoxStream<'static, Result<CompletionChunk, ModelError>>;

/// Raw answer to one turn, in either of its two shapes.
pub enum Completion {
    /// The whole message at once.
    Complete(AssistantReply),
    /// Incremental chunks still to be read.
    Streamed(ChunkStream),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(reply) => f.debug_tuple("Complete").field(reply).finish(),
            Self::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// A complete, non-streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

/// One increment of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionChunk {
    pub content: Option<String>,
    pub tool_call: Option<ToolCallDelta>,
}

impl CompletionChunk {
    /// A chunk carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_call: None,
        }
    }

    /// A chunk that opens a new tool call.
    pub fn call_start(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            content: None,
            tool_call: Some(ToolCallDelta {
                id: Some(id.into()),
                name: Some(name.into()),
                arguments: Some(arguments.into()),
            }),
        }
    }

    /// A chunk continuing the argument text of the current call.
    pub fn call_arguments(fragment: impl Into<String>) -> Self {
        Self {
            content: None,
            tool_call: Some(ToolCallDelta {
                id: None,
                name: None,
                arguments: Some(fragment.into()),
            }),
        }
    }
}

/// Tool-call fragment inside a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Trait for model-completion backends.
pub trait Backend: Send + Sync {
    /// Ask the model for the next turn.
    fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;
}
