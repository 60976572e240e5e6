//! Gemini Live websocket: realtime microphone audio in, transcripts out.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use lunai_core::{AudioChunk, Error, LiveAudioBackend, LiveChannel, LiveEvent, Result};

use super::types::{
    InlineData, LiveServerMessage, LiveSetup, LiveSetupMessage, RealtimeInput,
    RealtimeInputMessage,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for the Gemini Live transcription endpoint.
#[derive(Debug, Clone)]
pub struct GeminiLive {
    url: String,
    api_key: String,
    model: String,
}

impl GeminiLive {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Model name as the setup message expects it.
    fn qualified_model(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }
}

#[async_trait]
impl LiveAudioBackend for GeminiLive {
    async fn connect(&self) -> Result<Arc<dyn LiveChannel>> {
        let endpoint = format!("{}?key={}", self.url, self.api_key);
        let (ws, _) = connect_async(endpoint)
            .await
            .map_err(|e| Error::Transport(format!("Live connection failed: {}", e)))?;
        let (mut sink, stream) = ws.split();

        let setup = LiveSetupMessage {
            setup: LiveSetup {
                model: self.qualified_model(),
                input_audio_transcription: serde_json::Map::new(),
            },
        };
        sink.send(Message::Text(serde_json::to_string(&setup)?))
            .await
            .map_err(|e| Error::Transport(format!("Live setup failed: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "live",
            model = %self.model,
            "Live session opened"
        );

        Ok(Arc::new(GeminiLiveChannel {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            pending: std::sync::Mutex::new(VecDeque::new()),
        }))
    }
}

/// An open live socket. Sending and receiving lock separate halves, so the
/// forwarder and the transcript reader never wait on each other.
pub struct GeminiLiveChannel {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    /// Events decoded from one server message but not yet handed out.
    pending: std::sync::Mutex<VecDeque<LiveEvent>>,
}

impl GeminiLiveChannel {
    fn pop_pending(&self) -> Option<LiveEvent> {
        self.pending.lock().ok()?.pop_front()
    }

    fn push_pending(&self, events: impl IntoIterator<Item = LiveEvent>) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.extend(events);
        }
    }
}

#[async_trait]
impl LiveChannel for GeminiLiveChannel {
    async fn send_audio(&self, chunk: AudioChunk) -> Result<()> {
        trace!(chunk_bytes = chunk.data.len(), "Sending live audio chunk");
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![InlineData {
                    mime_type: chunk.mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(&chunk.data),
                }],
            },
        };
        let text = serde_json::to_string(&message)?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Transport(format!("Live send failed: {}", e)))
    }

    async fn next_event(&self) -> Option<Result<LiveEvent>> {
        loop {
            if let Some(event) = self.pop_pending() {
                return Some(Ok(event));
            }

            let message = self.stream.lock().await.next().await?;
            let payload = match message {
                Ok(Message::Text(text)) => text.into_bytes(),
                // The service delivers JSON in binary frames as well
                Ok(Message::Binary(data)) => data,
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Live session closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(Error::Transport(format!("Live receive failed: {}", e))))
                }
            };

            match parse_server_message(&payload) {
                Ok(events) => self.push_pending(events),
                Err(e) => warn!(error = %e, "Ignoring undecodable live message"),
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::Transport(format!("Live close failed: {}", e)))
    }
}

/// Decode a server message into the events we act on, in order:
/// transcript text first, then turn completion.
pub fn parse_server_message(payload: &[u8]) -> Result<Vec<LiveEvent>> {
    let message: LiveServerMessage = serde_json::from_slice(payload)?;
    let mut events = Vec::new();

    if let Some(content) = message.server_content {
        if let Some(text) = content.input_transcription.and_then(|t| t.text) {
            if !text.is_empty() {
                events.push(LiveEvent::Transcript(text));
            }
        }
        if content.turn_complete.unwrap_or(false) {
            events.push(LiveEvent::TurnComplete);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript() {
        let events =
            parse_server_message(br#"{"serverContent":{"inputTranscription":{"text":"Hel"}}}"#)
                .unwrap();
        assert_eq!(events, vec![LiveEvent::Transcript("Hel".to_string())]);
    }

    #[test]
    fn test_parse_turn_complete() {
        let events = parse_server_message(br#"{"serverContent":{"turnComplete":true}}"#).unwrap();
        assert_eq!(events, vec![LiveEvent::TurnComplete]);
    }

    #[test]
    fn test_parse_transcript_and_turn_complete_in_order() {
        let events = parse_server_message(
            br#"{"serverContent":{"inputTranscription":{"text":"lo"},"turnComplete":true}}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![LiveEvent::Transcript("lo".to_string()), LiveEvent::TurnComplete]
        );
    }

    #[test]
    fn test_parse_setup_complete_has_no_events() {
        let events = parse_server_message(br#"{"setupComplete":{}}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_server_message(b"not json").is_err());
    }

    #[test]
    fn test_setup_message_shape() {
        let live = GeminiLive::new("wss://example.test/ws", "k", "gemini-live");
        let setup = LiveSetupMessage {
            setup: LiveSetup {
                model: live.qualified_model(),
                input_audio_transcription: serde_json::Map::new(),
            },
        };
        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["setup"]["model"], "models/gemini-live");
        assert_eq!(json["setup"]["inputAudioTranscription"], serde_json::json!({}));
    }

    #[test]
    fn test_realtime_input_shape() {
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![InlineData {
                    mime_type: "audio/pcm;rate=16000".to_string(),
                    data: "AAA=".to_string(),
                }],
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json["realtimeInput"]["mediaChunks"][0]["mimeType"],
            "audio/pcm;rate=16000"
        );
    }

    #[test]
    fn test_qualified_model_is_idempotent() {
        let live = GeminiLive::new("wss://x", "k", "models/m");
        assert_eq!(live.qualified_model(), "models/m");
    }
}
