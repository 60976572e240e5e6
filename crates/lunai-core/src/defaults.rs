//! Centralized default constants for LUNai.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// ORACLE ENDPOINTS
// =============================================================================

/// Default Gemini REST base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// REST API version path segment.
pub const GEMINI_API_VERSION: &str = "v1beta";

/// Default Gemini Live (bidirectional audio) websocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Timeout for oracle requests in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Timeout for health checks in seconds.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// MODELS
// =============================================================================

/// Model used for short, fast extraction intents.
pub const FAST_MODEL: &str = "gemini-2.5-flash";

/// Model used for long-form extraction intents (documents, schedules, video).
pub const PRO_MODEL: &str = "gemini-2.5-pro";

/// Model backing standard chat mode.
pub const CHAT_MODEL: &str = "gemini-2.5-flash-lite";

/// Model backing extended-reasoning chat mode.
pub const REASONING_MODEL: &str = "gemini-2.5-pro";

/// Thinking budget (tokens) used in extended-reasoning chat mode.
pub const REASONING_THINKING_BUDGET: u32 = 32_768;

/// Speech synthesis model.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Prebuilt voice used for speech synthesis.
pub const TTS_VOICE: &str = "Kore";

/// Live transcription model.
pub const LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

// =============================================================================
// AUDIO
// =============================================================================

/// Sample rate of synthesized speech (PCM16, mono).
pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech.
pub const TTS_CHANNELS: u16 = 1;

/// Sample rate of captured microphone audio sent to the live session.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// MIME type tag for outbound microphone chunks.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Cadence at which buffered microphone audio is forwarded (milliseconds).
pub const AUDIO_CHUNK_INTERVAL_MS: u64 = 1_000;

// =============================================================================
// SESSION
// =============================================================================

/// Session event broadcast channel capacity.
pub const SESSION_EVENT_CAPACITY: usize = 64;

/// Capacity of the transcript event channel between the live socket and the session.
pub const LIVE_EVENT_CAPACITY: usize = 32;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// API credential. Required for every oracle-backed feature.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

/// Legacy name for the API credential.
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";

/// REST base URL override.
pub const ENV_BASE_URL: &str = "GEMINI_BASE_URL";

/// Live websocket URL override.
pub const ENV_LIVE_URL: &str = "GEMINI_LIVE_URL";

/// Fast tier model override.
pub const ENV_FAST_MODEL: &str = "LUNAI_FAST_MODEL";

/// Pro tier model override.
pub const ENV_PRO_MODEL: &str = "LUNAI_PRO_MODEL";

/// Standard chat model override.
pub const ENV_CHAT_MODEL: &str = "LUNAI_CHAT_MODEL";

/// Extended-reasoning chat model override.
pub const ENV_REASONING_MODEL: &str = "LUNAI_REASONING_MODEL";

/// Speech model override.
pub const ENV_TTS_MODEL: &str = "LUNAI_TTS_MODEL";

/// Speech voice override.
pub const ENV_TTS_VOICE: &str = "LUNAI_TTS_VOICE";

/// Live model override.
pub const ENV_LIVE_MODEL: &str = "LUNAI_LIVE_MODEL";

/// Request timeout override (seconds).
pub const ENV_TIMEOUT_SECS: &str = "LUNAI_TIMEOUT_SECS";

/// Log output format ("json" or "text").
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
