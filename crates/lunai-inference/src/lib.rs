//! # lunai-inference
//!
//! Oracle backend and structured extraction for the LUNai assistant.
//!
//! This crate provides:
//! - Gemini backend: one-shot, streamed and speech generation over REST,
//!   realtime transcription over the Live websocket
//! - Configuration from environment variables (and `.env`)
//! - Declared output schemas and the intent catalogue
//! - Fence stripping and schema-validated reply decoding
//! - The stateless `ExtractionClient` with one typed operation per intent
//!
//! # Feature Flags
//!
//! - `mock`: Enable the scripted `MockOracle` for downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use lunai_inference::ExtractionClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ExtractionClient::from_env().unwrap();
//!     let expense = client
//!         .categorize_expense("Hockey skates for Timmy $129.99 CAD")
//!         .await
//!         .unwrap();
//!     println!("{:?} {:?}", expense.category, expense.amount);
//! }
//! ```

pub mod extract;
pub mod gemini;
pub mod intent;
pub mod intents;
pub mod parse;
pub mod schema;

// Scripted oracle for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use lunai_core::*;

pub use extract::{ExtractionClient, ExtractionRequest, ExtractionResult};
pub use gemini::{GeminiBackend, GeminiConfig, GeminiErrorCode, GeminiLive};
pub use intent::{ExtractionIntent, IntentKind, MediaKind};
pub use intents::{
    intent, ActionLogResponse, CoachResponse, DocumentAnalysis, EvidenceAnalysis,
    EvidenceCategory, ExpenseCategorization, ExpenseCategory, ScheduleProposal, SleepPlan,
    VideoAnalysis, ALL_INTENTS,
};
pub use parse::{decode_validated, strip_code_fence};
pub use schema::{FieldSpec, FieldType, OutputSchema};
