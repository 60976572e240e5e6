//! PCM audio helpers.

use crate::error::{Error, Result};

/// Decoded, playable audio: planar `f32` samples in `[-1.0, 1.0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    /// One vector per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Decode interleaved little-endian PCM16 into a planar float buffer.
///
/// Each sample is divided by 32768, so `i16::MIN` maps to exactly `-1.0`.
pub fn decode_pcm16(data: &[u8], sample_rate: u32, channel_count: u16) -> Result<PcmBuffer> {
    if channel_count == 0 {
        return Err(Error::Audio("channel count must be at least 1".to_string()));
    }
    if data.len() % 2 != 0 {
        return Err(Error::Audio(format!(
            "PCM16 payload has odd length {}",
            data.len()
        )));
    }

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    let channel_count = channel_count as usize;
    if samples.len() % channel_count != 0 {
        return Err(Error::Audio(format!(
            "{} samples do not divide into {} channels",
            samples.len(),
            channel_count
        )));
    }

    let frame_count = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample as f32 / 32768.0);
        }
    }

    Ok(PcmBuffer {
        sample_rate,
        channels,
    })
}
