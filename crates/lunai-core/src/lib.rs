//! # lunai-core
//!
//! Core types, traits, and abstractions for the LUNai co-parenting assistant.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the inference and session crates depend on: content parts, chat turns,
//! the error taxonomy, backend traits and the PCM audio helpers.

pub mod audio;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use audio::{decode_pcm16, PcmBuffer};
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use traits::*;
