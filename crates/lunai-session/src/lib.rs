//! # lunai-session
//!
//! Conversational session management for the LUNai assistant.
//!
//! This crate provides:
//! - `ChatSession`: turn history, streamed replies, the standard and
//!   extended-reasoning modes, voice input and read-aloud
//! - `AudioSubSession`: microphone capture forwarded to a live transcription
//!   channel, with the device released on every exit path
//! - `ExtractionForm`: loading/result/error state for one extraction screen
//! - `SessionEvent`: broadcast notifications for a UI layer
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lunai_inference::GeminiBackend;
//! use lunai_session::ChatSession;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(GeminiBackend::from_env().unwrap());
//!     let session = ChatSession::with_gemini(backend);
//!     session.submit_turn("My son won't talk about his weekend at his dad's.", None)
//!         .await
//!         .unwrap();
//!     for turn in session.turns() {
//!         println!("{:?}: {}", turn.role, turn.text);
//!     }
//! }
//! ```

pub mod chat;
pub mod events;
pub mod form;
pub mod recording;
pub mod speech;

#[cfg(test)]
mod testing;

pub use chat::{
    ChatConfig, ChatSession, ModelBinding, CHAT_SYSTEM_INSTRUCTION, FALLBACK_REPLY, GREETING,
};
pub use events::{SessionError, SessionEvent};
pub use form::{ExtractionForm, FormState};
pub use recording::{AudioSubSession, CaptureGuard};
pub use speech::speak;
