//! Server-sent-event framing for streamed chat completions.
//!
//! Splits the body on blank lines, joins the `data:` lines of each event and
//! stops at the `[DONE]` sentinel.

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::llm::ModelError;

const DONE: &str = "[DONE]";

/// Turn a byte stream into a stream of event payloads.
pub(crate) fn data_events<S, B, E>(bytes: S) -> BoxStream<'static, Result<String, ModelError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = Framer {
        bytes: bytes.boxed(),
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        let item = state.next_event().await?;
        Some((item, state))
    })
    .boxed()
}

struct Framer<B, E> {
    bytes: BoxStream<'static, Result<B, E>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl<B, E> Framer<B, E>
where
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    async fn next_event(&mut self) -> Option<Result<String, ModelError>> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(end) = find_boundary(&self.buffer) {
                let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
                match self.payload(&event) {
                    Some(item) => return Some(item),
                    None if self.finished => return None,
                    None => continue,
                }
            }

            match self.bytes.next().await {
                Some(Ok(bytes)) => self
                    .buffer
                    .extend(bytes.as_ref().iter().filter(|&&b| b != b'\r')),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(ModelError::Stream(e.to_string())));
                }
                None => {
                    self.finished = true;
                    let rest = std::mem::take(&mut self.buffer);
                    return self.payload(&rest);
                }
            }
        }
    }

    /// Data of one event; `None` for keep-alives, comments and `[DONE]`.
    fn payload(&mut self, event: &[u8]) -> Option<Result<String, ModelError>> {
        let text = String::from_utf8_lossy(event);
        let data: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.strip_prefix(' ').unwrap_or(data))
            .collect();

        if data.is_empty() {
            return None;
        }
        let data = data.join("\n");
        if data.trim() == DONE {
            self.finished = true;
            return None;
        }
        Some(Ok(data))
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}
