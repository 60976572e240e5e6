//! Error types for LUNai.

use thiserror::Error;

/// Result type alias using LUNai's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Generic message shown to the user when the oracle could not be reached.
pub const TRANSPORT_USER_MESSAGE: &str =
    "The AI service could not be reached. Please try again in a moment.";

/// Generic message shown to the user when the oracle reply was unusable.
pub const SCHEMA_USER_MESSAGE: &str = "The AI returned an invalid response format.";

/// Core error type for LUNai operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (API credential, endpoint, model)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input, rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network, timeout, authentication or rate-limit failure from the oracle
    #[error("Transport error: {0}")]
    Transport(String),

    /// The oracle replied, but the payload does not match the declared shape
    #[error("Schema violation: {message}")]
    SchemaViolation {
        /// What was wrong with the payload.
        message: String,
        /// The raw reply text, kept for diagnostics.
        raw: String,
    },

    /// Local device unavailable, denied or already in use
    #[error("Resource error: {0}")]
    Resource(String),

    /// Malformed audio payload
    #[error("Audio error: {0}")]
    Audio(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used by callers that only need to
/// decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Transport,
    SchemaViolation,
    Resource,
    Internal,
}

impl Error {
    /// Build a schema violation that keeps the raw reply.
    pub fn schema(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::SchemaViolation {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::InvalidInput(_) => ErrorKind::Validation,
            Error::Transport(_) => ErrorKind::Transport,
            Error::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Error::Resource(_) => ErrorKind::Resource,
            Error::Audio(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Raw oracle text retained by a schema violation.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::SchemaViolation { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Message suitable for inline display next to the form or chat.
    ///
    /// Validation, configuration and resource messages are already written for
    /// the user; transport failures are replaced by a generic sentence and the
    /// original message is left for logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(msg) | Error::InvalidInput(msg) | Error::Resource(msg) => msg.clone(),
            Error::Transport(_) => TRANSPORT_USER_MESSAGE.to_string(),
            Error::SchemaViolation { .. } => SCHEMA_USER_MESSAGE.to_string(),
            Error::Audio(_) => "Failed to generate audio.".to_string(),
            Error::Serialization(_) | Error::Io(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("Request timed out: {}", e))
        } else {
            Error::Transport(e.to_string())
        }
    }
}
