//! Response normalization.
//!
//! Both completion shapes collapse into one [`Turn`]: an assistant message
//! plus the tool calls it requested.

use futures::StreamExt;
use tracing::error;

use crate::backend::{ChunkStream, Completion};
use crate::llm::{Message, ModelError, ToolCallRequest};

/// Canonical outcome of one model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Assistant message to append to the transcript.
    pub message: Message,
    /// Calls to dispatch, in the order the model emitted them.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Turn {
    fn new(content: String, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            message: Message::assistant(content, tool_calls.clone()),
            tool_calls,
        }
    }
}

/// Normalize a raw completion. Streams are read to the end first.
pub async fn normalize(completion: Completion) -> Result<Turn, ModelError> {
    match completion {
        Completion::Complete(reply) => Ok(Turn::new(
            reply.content.unwrap_or_default(),
            reply.tool_calls,
        )),
        Completion::Streamed(chunks) => aggregate(chunks).await,
    }
}

/// Fold a chunk stream into a turn.
///
/// A chunk carrying a new call id opens a new call. Fragments without an id,
/// or repeating the open call's id, extend the open call. One call is open
/// at a time, so interleaved calls are not supported.
async fn aggregate(mut chunks: ChunkStream) -> Result<Turn, ModelError> {
    let mut content = String::new();
    let mut finished = Vec::new();
    let mut open: Option<ToolCallRequest> = None;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.inspect_err(|e| error!(error = %e, "model stream failed"))?;

        if let Some(delta) = chunk.tool_call {
            let repeats_open = matches!(
                (&delta.id, &open),
                (Some(id), Some(call)) if *id == call.id
            );
            match delta.id {
                Some(id) if !repeats_open => {
                    let started = ToolCallRequest {
                        id,
                        name: delta.name.unwrap_or_default(),
                        raw_arguments: delta.arguments.unwrap_or_default(),
                    };
                    finished.extend(open.replace(started));
                }
                _ => {
                    if let Some(call) = open.as_mut() {
                        extend(call, delta.name, delta.arguments);
                    }
                }
            }
        }

        if let Some(text) = chunk.content {
            content.push_str(&text);
        }
    }

    finished.extend(open);
    Ok(Turn::new(content, finished))
}

fn extend(call: &mut ToolCallRequest, name: Option<String>, fragment: Option<String>) {
    if call.name.is_empty() {
        if let Some(name) = name {
            call.name = name;
        }
    }
    if let Some(fragment) = fragment {
        call.raw_arguments.push_str(&fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AssistantReply, CompletionChunk};
    use futures::stream;

    fn streamed(chunks: Vec<CompletionChunk>) -> Completion {
        Completion::Streamed(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    #[tokio::test]
    async fn complete_reply_maps_directly() {
        let call = ToolCallRequest::new("call_1", "getTime", "{\"tz\":\"UTC\"}");
        let turn = normalize(Completion::Complete(AssistantReply {
            content: Some("checking".into()),
            tool_calls: vec![call.clone()],
        }))
        .await
        .unwrap();

        assert_eq!(turn.tool_calls, vec![call.clone()]);
        assert_eq!(turn.message, Message::assistant("checking", vec![call]));
    }

    #[tokio::test]
    async fn missing_content_becomes_empty() {
        let turn = normalize(Completion::Complete(AssistantReply::default()))
            .await
            .unwrap();
        assert_eq!(turn.message, Message::assistant("", Vec::new()));
        assert!(turn.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn stream_concatenates_content() {
        let turn = normalize(streamed(vec![
            CompletionChunk::text("The area "),
            CompletionChunk::default(),
            CompletionChunk::text("is 201.06"),
        ]))
        .await
        .unwrap();

        assert_eq!(turn.message.content, "The area is 201.06");
        assert!(turn.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn stream_accumulates_argument_fragments() {
        let turn = normalize(streamed(vec![
            CompletionChunk::call_start("call_1", "calculate_area", ""),
            CompletionChunk::call_arguments("{\"radius\""),
            CompletionChunk::call_arguments(": 8}"),
        ]))
        .await
        .unwrap();

        assert_eq!(
            turn.tool_calls,
            vec![ToolCallRequest::new("call_1", "calculate_area", "{\"radius\": 8}")]
        );
    }

    #[tokio::test]
    async fn new_call_id_closes_the_open_call() {
        let turn = normalize(streamed(vec![
            CompletionChunk::call_start("call_1", "a", "{}"),
            CompletionChunk::call_start("call_2", "b", "{\"x\""),
            CompletionChunk::call_arguments(":1}"),
        ]))
        .await
        .unwrap();

        assert_eq!(
            turn.tool_calls,
            vec![
                ToolCallRequest::new("call_1", "a", "{}"),
                ToolCallRequest::new("call_2", "b", "{\"x\":1}"),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_call_id_extends_the_open_call() {
        let turn = normalize(streamed(vec![
            CompletionChunk::call_start("call_1", "getTime", "{\"tz\""),
            CompletionChunk::call_start("call_1", "", ":\"UTC\"}"),
        ]))
        .await
        .unwrap();

        assert_eq!(
            turn.tool_calls,
            vec![ToolCallRequest::new("call_1", "getTime", "{\"tz\":\"UTC\"}")]
        );
    }

    #[tokio::test]
    async fn repeated_call_id_fills_a_late_name() {
        let turn = normalize(streamed(vec![
            CompletionChunk::call_start("call_1", "", "{"),
            CompletionChunk::call_start("call_1", "getTime", "}"),
        ]))
        .await
        .unwrap();

        assert_eq!(turn.tool_calls, vec![ToolCallRequest::new("call_1", "getTime", "{}")]);
    }

    #[tokio::test]
    async fn fragments_without_open_call_are_dropped() {
        let turn = normalize(streamed(vec![CompletionChunk::call_arguments("{}")]))
            .await
            .unwrap();
        assert!(turn.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn stream_error_propagates() {
        let chunks = stream::iter(vec![
            Ok(CompletionChunk::text("partial")),
            Err(ModelError::Stream("connection reset".into())),
        ])
        .boxed();

        let err = normalize(Completion::Streamed(chunks)).await.unwrap_err();
        assert!(matches!(err, ModelError::Stream(_)));
    }

    #[tokio::test]
    async fn streamed_and_complete_forms_agree() {
        let call = ToolCallRequest::new("call_9", "getTime", "{\"timezone\": \"Asia/Shanghai\"}");

        let complete = normalize(Completion::Complete(AssistantReply {
            content: Some("Let me check.".into()),
            tool_calls: vec![call],
        }))
        .await
        .unwrap();

        let from_stream = normalize(streamed(vec![
            CompletionChunk::text("Let me "),
            CompletionChunk::call_start("call_9", "getTime", "{\"timezone\""),
            CompletionChunk::text("check."),
            CompletionChunk::call_arguments(": \"Asia/Shanghai\"}"),
        ]))
        .await
        .unwrap();

        assert_eq!(complete, from_stream);

        let plain_complete = normalize(Completion::Complete(AssistantReply {
            content: Some("done".into()),
            tool_calls: Vec::new(),
        }))
        .await
        .unwrap();
        let plain_streamed = normalize(streamed(vec![CompletionChunk::text("done")]))
            .await
            .unwrap();
        assert_eq!(plain_complete, plain_streamed);
    }
}
