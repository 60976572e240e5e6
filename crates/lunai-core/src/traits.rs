//! Core traits for LUNai abstractions.
//!
//! These traits define the interfaces that concrete backends and devices must
//! satisfy, enabling pluggable oracles and in-memory fakes for tests.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::audio::PcmBuffer;
use crate::error::Result;
use crate::models::{AudioChunk, LiveEvent, OracleRequest};

// =============================================================================
// ORACLE TRAITS
// =============================================================================

/// Stream of reply fragments, in arrival order. Finite and not restartable.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Backend for one-shot generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one request and return the reply text.
    async fn generate(&self, request: OracleRequest) -> Result<String>;

    /// Check if the backend is reachable and the credential is accepted.
    async fn health_check(&self) -> Result<bool>;
}

/// Backend for streamed generation.
#[async_trait]
pub trait StreamingGeneration: Send + Sync {
    /// Issue one request and return its reply as a fragment stream.
    async fn generate_stream(&self, request: OracleRequest) -> Result<TokenStream>;
}

/// Backend for speech synthesis.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize `text` and return raw little-endian PCM16 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Sample rate of the returned audio.
    fn sample_rate(&self) -> u32;

    /// Channel count of the returned audio.
    fn channels(&self) -> u16;
}

// =============================================================================
// LIVE AUDIO TRAITS
// =============================================================================

/// Backend able to open a real-time transcription channel.
#[async_trait]
pub trait LiveAudioBackend: Send + Sync {
    /// Open a new channel. The returned handle is shared between the outbound
    /// forwarder and the inbound transcript reader.
    async fn connect(&self) -> Result<Arc<dyn LiveChannel>>;
}

/// A bidirectional real-time audio channel.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Send one chunk of encoded microphone audio.
    async fn send_audio(&self, chunk: AudioChunk) -> Result<()>;

    /// Next inbound event, or `None` once the channel has closed.
    async fn next_event(&self) -> Option<Result<LiveEvent>>;

    /// Close the channel.
    async fn close(&self) -> Result<()>;
}

// =============================================================================
// DEVICE TRAITS
// =============================================================================

/// A microphone that can be opened exclusively.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the device. Permission denied or unavailable is a
    /// [`crate::Error::Resource`].
    async fn open(&self) -> Result<Box<dyn CaptureStream>>;
}

/// An open microphone stream producing PCM16 frames.
#[async_trait]
pub trait CaptureStream: Send {
    /// MIME type of the produced frames.
    fn mime_type(&self) -> &str;

    /// Next captured frame, or `None` when the device stopped producing.
    async fn next_frame(&mut self) -> Option<Vec<u8>>;

    /// Release the device. Must be idempotent.
    fn release(&mut self);
}

/// Audio output.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play a decoded buffer.
    async fn play(&self, buffer: PcmBuffer) -> Result<()>;
}
