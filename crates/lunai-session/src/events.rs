//! Session notifications.

use lunai_core::{ChatMode, Error, ErrorKind, TurnId};

/// Last error recorded by a session, in a form that can be cloned to every
/// subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    /// Text to show inline next to the chat.
    pub message: String,
    /// Full error text, for logs and diagnostics.
    pub detail: String,
}

impl From<&Error> for SessionError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

/// Event emitted by a chat session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A turn was appended to the history.
    TurnAppended(TurnId),
    /// The in-progress assistant turn received text, or was finalized.
    TurnUpdated(TurnId),
    /// The pending input was replaced.
    InputChanged(String),
    /// The model binding changed.
    ModeChanged(ChatMode),
    RecordingStarted,
    RecordingStopped,
    Error(SessionError),
}
