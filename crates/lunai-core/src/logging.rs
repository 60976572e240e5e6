//! Structured logging schema, field name constants and subscriber setup.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Feature unusable (missing configuration) |
//! | WARN  | Recoverable issue: schema violation, remote close failure, fallback turn |
//! | INFO  | Lifecycle events: backend init, recording start/stop, mode change |
//! | DEBUG | Per-call decisions: model chosen, prompt length, reply length |
//! | TRACE | Per-fragment and per-chunk data |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defaults::ENV_LOG_FORMAT;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "inference", "session"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "gemini", "extraction", "chat", "recording", "speech"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "generate", "stream", "extract", "submit_turn", "synthesize"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Extraction intent name.
pub const INTENT: &str = "intent";

/// Chat turn id.
pub const TURN_ID: &str = "turn_id";

/// Model name used for the call.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

/// Number of streamed fragments received.
pub const FRAGMENT_COUNT: &str = "fragment_count";

/// Byte length of a forwarded audio chunk.
pub const CHUNK_BYTES: &str = "chunk_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Set `LOG_FORMAT=json`
/// for JSON lines. Returns `false` when a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.is_ok()
}
