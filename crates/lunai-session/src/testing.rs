//! In-memory capture, live and playback fakes for session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use lunai_core::{
    AudioChunk, AudioSink, CaptureDevice, CaptureStream, Error, LiveAudioBackend, LiveChannel,
    LiveEvent, PcmBuffer, Result,
};

// =============================================================================
// CAPTURE
// =============================================================================

#[derive(Clone, Default)]
pub struct FakeCapture {
    frames: Arc<Mutex<VecDeque<Vec<u8>>>>,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    denied: bool,
    finite: bool,
}

impl FakeCapture {
    /// A device that yields `frames` once, then waits forever.
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: Arc::new(Mutex::new(frames.into())),
            ..Default::default()
        }
    }

    /// A device that yields `frames` and then stops delivering audio.
    pub fn finite(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: Arc::new(Mutex::new(frames.into())),
            finite: true,
            ..Default::default()
        }
    }

    /// A device whose permission prompt was refused.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for FakeCapture {
    async fn open(&self) -> Result<Box<dyn CaptureStream>> {
        if self.denied {
            return Err(Error::Resource("Microphone permission denied.".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            frames: self.frames.clone(),
            releases: self.releases.clone(),
            finite: self.finite,
        }))
    }
}

struct FakeStream {
    frames: Arc<Mutex<VecDeque<Vec<u8>>>>,
    releases: Arc<AtomicUsize>,
    finite: bool,
}

#[async_trait]
impl CaptureStream for FakeStream {
    fn mime_type(&self) -> &str {
        lunai_core::defaults::CAPTURE_MIME_TYPE
    }

    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        let next = self.frames.lock().unwrap().pop_front();
        match next {
            Some(frame) => Some(frame),
            None if self.finite => None,
            None => std::future::pending().await,
        }
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// LIVE CHANNEL
// =============================================================================

pub struct FakeChannel {
    sent: Mutex<Vec<AudioChunk>>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<LiveEvent>>>,
    closed: AtomicBool,
    fail_close: bool,
}

#[async_trait]
impl LiveChannel for FakeChannel {
    async fn send_audio(&self, chunk: AudioChunk) -> Result<()> {
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn next_event(&self) -> Option<Result<LiveEvent>> {
        self.inbound.lock().await.recv().await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::Transport("Live close failed: connection reset".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeLive {
    channel: Arc<FakeChannel>,
    inbound_tx: mpsc::UnboundedSender<Result<LiveEvent>>,
    fail_connect: bool,
}

impl FakeLive {
    fn build(fail_connect: bool, fail_close: bool) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            channel: Arc::new(FakeChannel {
                sent: Mutex::new(Vec::new()),
                inbound: tokio::sync::Mutex::new(inbound_rx),
                closed: AtomicBool::new(false),
                fail_close,
            }),
            inbound_tx,
            fail_connect,
        }
    }

    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn failing_connect() -> Self {
        Self::build(true, false)
    }

    pub fn failing_close() -> Self {
        Self::build(false, true)
    }

    /// Deliver an inbound event to the open channel.
    pub fn emit(&self, event: LiveEvent) {
        self.inbound_tx.send(Ok(event)).unwrap();
    }

    /// Make the open channel fail with a transport error.
    pub fn fail(&self, message: &str) {
        self.inbound_tx
            .send(Err(Error::Transport(message.to_string())))
            .unwrap();
    }

    pub fn sent_chunks(&self) -> Vec<AudioChunk> {
        self.channel.sent.lock().unwrap().clone()
    }

    pub fn closed(&self) -> bool {
        self.channel.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveAudioBackend for FakeLive {
    async fn connect(&self) -> Result<Arc<dyn LiveChannel>> {
        if self.fail_connect {
            return Err(Error::Transport("Live connection failed: refused".to_string()));
        }
        Ok(self.channel.clone())
    }
}

// =============================================================================
// PLAYBACK
// =============================================================================

#[derive(Clone, Default)]
pub struct FakeSink {
    played: Arc<Mutex<Vec<PcmBuffer>>>,
    fail: bool,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn played(&self) -> Vec<PcmBuffer> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, buffer: PcmBuffer) -> Result<()> {
        if self.fail {
            return Err(Error::Resource("Audio output unavailable.".to_string()));
        }
        self.played.lock().unwrap().push(buffer);
        Ok(())
    }
}
