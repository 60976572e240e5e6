//! Realtime audio sub-session: microphone audio out, transcript in.
//!
//! The capture stream lives inside a [`CaptureGuard`] owned by the forwarder
//! task. Whatever ends that task (stop signal, device exhaustion, a dropped
//! sub-session, a panic) drops the guard and releases the device.
//!
//! A sub-session that dies on its own (the microphone stops delivering audio,
//! the live channel fails or closes) reports the first such failure on a
//! one-shot receiver. An explicit stop disarms it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use lunai_core::{
    AudioChunk, CaptureDevice, CaptureStream, Error, LiveAudioBackend, LiveChannel, LiveEvent,
    Result,
};

use crate::events::SessionEvent;

/// Exclusive hold on an open capture stream. Releases it on drop.
pub struct CaptureGuard {
    stream: Option<Box<dyn CaptureStream>>,
    mime_type: String,
}

impl CaptureGuard {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        let mime_type = stream.mime_type().to_string();
        Self {
            stream: Some(stream),
            mime_type,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    /// Next frame, or `None` once the device is exhausted or released.
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame().await,
            None => None,
        }
    }

    /// Release the device. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!(subsystem = "session", component = "recording", "Capture device released");
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.release();
    }
}

static NEXT_SUB_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// First unexpected failure of a sub-session's tasks. Later reports, and any
/// report after `disarm`, are dropped.
#[derive(Clone)]
struct FailureSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<Error>>>>,
}

impl FailureSignal {
    fn new() -> (Self, oneshot::Receiver<Error>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    fn take(&self) -> Option<oneshot::Sender<Error>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn report(&self, err: Error) {
        if let Some(tx) = self.take() {
            let _ = tx.send(err);
        }
    }

    fn disarm(&self) {
        self.take();
    }
}

/// A running recording: forwarder and transcript tasks over one live channel.
pub struct AudioSubSession {
    id: u64,
    channel: Arc<dyn LiveChannel>,
    stop_tx: Option<oneshot::Sender<()>>,
    forwarder: Option<JoinHandle<()>>,
    transcript: JoinHandle<()>,
    failure: FailureSignal,
    failure_rx: Option<oneshot::Receiver<Error>>,
}

impl AudioSubSession {
    /// Acquire the microphone, open the live channel and start both tasks.
    ///
    /// If the channel cannot be opened the device is released before the
    /// error is returned.
    pub async fn start(
        capture: &dyn CaptureDevice,
        live: &dyn LiveAudioBackend,
        pending_input: Arc<watch::Sender<String>>,
        events: broadcast::Sender<SessionEvent>,
        chunk_interval: Duration,
    ) -> Result<Self> {
        let guard = CaptureGuard::new(capture.open().await?);
        let channel = live.connect().await?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let (failure, failure_rx) = FailureSignal::new();
        let forwarder = tokio::spawn(forward_audio(
            guard,
            channel.clone(),
            chunk_interval,
            stop_rx,
            failure.clone(),
        ));
        let transcript = tokio::spawn(read_transcripts(
            channel.clone(),
            pending_input,
            events,
            failure.clone(),
        ));

        info!(
            subsystem = "session",
            component = "recording",
            chunk_interval_ms = chunk_interval.as_millis() as u64,
            "Recording started"
        );

        Ok(Self {
            id: NEXT_SUB_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            channel,
            stop_tx: Some(stop_tx),
            forwarder: Some(forwarder),
            transcript,
            failure,
            failure_rx: Some(failure_rx),
        })
    }

    /// Process-unique id of this recording.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receiver for the first failure that ends the recording on its own.
    /// Resolves to an error instead if the sub-session is stopped or dropped
    /// first. Available once.
    pub fn take_failure(&mut self) -> Option<oneshot::Receiver<Error>> {
        self.failure_rx.take()
    }

    /// Flush and release the microphone, then close the live channel.
    ///
    /// The device is released before the close is attempted, so a close
    /// failure never leaves it held.
    pub async fn stop(mut self) -> Result<()> {
        self.failure.disarm();
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(e) = forwarder.await {
                warn!(error = %e, "Audio forwarder ended abnormally");
            }
        }

        let closed = self.channel.close().await;
        self.transcript.abort();

        match &closed {
            Ok(()) => info!(subsystem = "session", component = "recording", "Recording stopped"),
            Err(e) => warn!(
                subsystem = "session",
                component = "recording",
                error = %e,
                "Live channel close failed; capture already released"
            ),
        }
        closed
    }
}

impl Drop for AudioSubSession {
    fn drop(&mut self) {
        // Not stopped explicitly: the forwarder sees the closed signal and
        // releases the device on its own.
        self.failure.disarm();
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.transcript.abort();
    }
}

/// Buffer captured frames and send them on a fixed cadence until stopped.
async fn forward_audio(
    mut guard: CaptureGuard,
    channel: Arc<dyn LiveChannel>,
    chunk_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    failure: FailureSignal,
) {
    let mime_type = guard.mime_type().to_string();
    let mut buffer: Vec<u8> = Vec::new();
    let mut ticker = tokio::time::interval(chunk_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            frame = guard.next_frame() => match frame {
                Some(frame) => buffer.extend_from_slice(&frame),
                None => {
                    warn!("Capture stream ended while recording");
                    failure.report(Error::Resource(
                        "The microphone stopped delivering audio.".to_string(),
                    ));
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(&mime_type, channel.as_ref(), &mut buffer).await;
            }
        }
    }

    flush(&mime_type, channel.as_ref(), &mut buffer).await;
    guard.release();
}

async fn flush(mime_type: &str, channel: &dyn LiveChannel, buffer: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }
    let chunk = AudioChunk {
        mime_type: mime_type.to_string(),
        data: std::mem::take(buffer),
    };
    trace!(chunk_bytes = chunk.data.len(), "Forwarding audio chunk");
    if let Err(e) = channel.send_audio(chunk).await {
        warn!(error = %e, "Failed to forward audio chunk");
    }
}

/// Accumulate transcript fragments and mirror the whole accumulator into the
/// pending input on every update.
async fn read_transcripts(
    channel: Arc<dyn LiveChannel>,
    pending_input: Arc<watch::Sender<String>>,
    events: broadcast::Sender<SessionEvent>,
    failure: FailureSignal,
) {
    let mut transcript = String::new();

    let err = loop {
        match channel.next_event().await {
            Some(Ok(LiveEvent::Transcript(fragment))) => {
                transcript.push_str(&fragment);
                trace!(fragment_len = fragment.len(), "Transcript fragment");
            }
            Some(Ok(LiveEvent::TurnComplete)) => {
                debug!(transcript_len = transcript.len(), "Transcript turn complete");
            }
            Some(Err(e)) => break Error::Transport(format!("Live session error: {}", e)),
            None => break Error::Transport("Live session closed unexpectedly.".to_string()),
        }
        pending_input.send_replace(transcript.clone());
        let _ = events.send(SessionEvent::InputChanged(transcript.clone()));
    };

    warn!(error = %err, "Transcript reader stopping");
    failure.report(err);
}
