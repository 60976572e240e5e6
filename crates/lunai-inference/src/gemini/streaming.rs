//! SSE stream parsing for `streamGenerateContent?alt=sse`.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};

use lunai_core::{Error, Result, TokenStream};

use super::types::GenerateContentResponse;

/// Reassembles SSE lines that arrive split across network chunks.
///
/// Bytes are buffered until a newline so multi-byte UTF-8 sequences are never
/// cut in half.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Feed one network chunk, returning the payloads of every complete
    /// `data:` line it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);

    // Comments and event/id fields carry nothing we use
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Decode one `data:` payload into its reply fragment.
///
/// Returns `None` for chunks without visible text (metadata-only or thought
/// summaries).
fn parse_event_data(data: &str) -> Option<Result<String>> {
    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(chunk) => {
            if let Some(reason) = chunk.block_reason() {
                return Some(Err(Error::Transport(format!(
                    "Prompt blocked: {}",
                    reason
                ))));
            }
            let text = chunk.text();
            if text.is_empty() {
                None
            } else {
                Some(Ok(text))
            }
        }
        Err(e) => Some(Err(Error::Transport(format!(
            "Failed to parse stream chunk: {}",
            e
        )))),
    }
}

type ByteStream<E> =
    std::pin::Pin<Box<dyn Stream<Item = std::result::Result<bytes::Bytes, E>> + Send>>;

struct SseState<E> {
    inner: ByteStream<E>,
    lines: SseLineBuffer,
    ready: VecDeque<Result<String>>,
    done: bool,
}

/// Parse an SSE byte stream into reply fragments.
///
/// The stream ends after the first error.
pub fn parse_sse_stream<E>(
    stream: impl Stream<Item = std::result::Result<bytes::Bytes, E>> + Send + 'static,
) -> TokenStream
where
    E: Display + Send + 'static,
{
    let state = SseState {
        inner: Box::pin(stream),
        lines: SseLineBuffer::default(),
        ready: VecDeque::new(),
        done: false,
    };

    let fragments = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => {
                    for data in state.lines.push(&bytes) {
                        if let Some(fragment) = parse_event_data(&data) {
                            let failed = fragment.is_err();
                            state.ready.push_back(fragment);
                            if failed {
                                state.done = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state
                        .ready
                        .push_back(Err(Error::Transport(format!("Stream error: {}", e))));
                    state.done = true;
                }
                None => {
                    if let Some(fragment) = state.lines.finish().and_then(|d| parse_event_data(&d))
                    {
                        state.ready.push_back(fragment);
                    }
                    state.done = true;
                }
            }
        }
    });

    Box::pin(fragments)
}
