//! One-shot text-to-speech.

use std::time::Instant;

use tracing::{debug, instrument};

use lunai_core::{decode_pcm16, AudioSink, Error, PcmBuffer, Result, SpeechBackend};

/// Synthesize `text`, decode the PCM16 reply and hand it to `sink`.
///
/// Returns the buffer's playback length in seconds.
#[instrument(
    skip(speech, sink, text),
    fields(subsystem = "session", component = "speech", op = "synthesize")
)]
pub async fn speak(speech: &dyn SpeechBackend, sink: &dyn AudioSink, text: &str) -> Result<f64> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("Please enter some text to read aloud.".to_string()));
    }

    let start = Instant::now();
    let audio = speech.synthesize(text).await?;
    let buffer: PcmBuffer = decode_pcm16(&audio, speech.sample_rate(), speech.channels())?;
    let duration = buffer.duration_secs();

    debug!(
        audio_bytes = audio.len(),
        frames = buffer.frame_count(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Playing synthesized speech"
    );
    sink.play(buffer).await?;
    Ok(duration)
}
