//! Google Gemini backend.
//!
//! REST `generateContent` for one-shot and structured generation, SSE
//! `streamGenerateContent` for chat, speech synthesis through the TTS model,
//! and the Live websocket for realtime transcription.
//!
//! # Example
//!
//! ```rust,no_run
//! use lunai_core::{ContentPart, GenerationBackend, OracleRequest};
//! use lunai_inference::gemini::{GeminiBackend, GeminiConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     // From GEMINI_API_KEY and friends
//!     let backend = GeminiBackend::from_env().unwrap();
//!
//!     // Or explicitly
//!     let backend = GeminiBackend::new(GeminiConfig::with_api_key("my-key")).unwrap();
//!
//!     let request = OracleRequest::single(
//!         "gemini-2.5-flash",
//!         "Answer briefly.",
//!         vec![ContentPart::text("What is a parenting plan?")],
//!     );
//!     let reply = backend.generate(request).await.unwrap();
//!     println!("{}", reply);
//! }
//! ```

mod backend;
mod error;
mod live;
mod streaming;
mod types;

pub use backend::{GeminiBackend, GeminiConfig};
pub use error::{to_lunai_error, GeminiErrorCode};
pub use live::{parse_server_message, GeminiLive, GeminiLiveChannel};
pub use streaming::{parse_sse_stream, SseLineBuffer};
pub use types::*;
