//! Core data models for LUNai.
//!
//! These types are shared by the inference and session crates and represent
//! the content exchanged with the oracle and the conversation history.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// CONTENT PARTS
// =============================================================================

/// One piece of content sent to the oracle.
///
/// Binary content stays raw here; base64 encoding happens at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Binary content with its MIME type, forwarded unchanged.
    Inline { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    /// Text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    /// Binary part with a caller-supplied MIME type.
    pub fn inline(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        ContentPart::Inline {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Binary part whose MIME type is detected from magic bytes.
    pub fn sniffed(data: Vec<u8>) -> Result<Self> {
        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type().to_string())
            .ok_or_else(|| {
                Error::InvalidInput("Could not determine the file type of the attachment.".into())
            })?;
        Ok(ContentPart::Inline { mime_type, data })
    }

    /// Read an attachment from disk and detect its MIME type.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::sniffed(data)
    }

    /// Whether this is a text part containing only whitespace (or nothing).
    pub fn is_blank_text(&self) -> bool {
        matches!(self, ContentPart::Text(t) if t.trim().is_empty())
    }

    /// MIME type of a binary part.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            ContentPart::Text(_) => None,
            ContentPart::Inline { mime_type, .. } => Some(mime_type),
        }
    }

    /// Approximate payload size in bytes, used for logging.
    pub fn len(&self) -> usize {
        match self {
            ContentPart::Text(t) => t.len(),
            ContentPart::Inline { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An image attached to a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn to_part(&self) -> ContentPart {
        ContentPart::inline(self.mime_type.clone(), self.data.clone())
    }
}

// =============================================================================
// MODEL SELECTION
// =============================================================================

/// Size tier of an extraction intent; decides which model variant serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Short inputs, fast model.
    Fast,
    /// Long-form inputs or heavier reasoning.
    Pro,
}

/// Chat reasoning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Standard,
    ExtendedReasoning,
}

impl ChatMode {
    /// Thinking budget attached to requests in this mode.
    pub fn thinking_budget(&self) -> Option<u32> {
        match self {
            ChatMode::Standard => None,
            ChatMode::ExtendedReasoning => Some(defaults::REASONING_THINKING_BUDGET),
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Standard => write!(f, "standard"),
            ChatMode::ExtendedReasoning => write!(f, "extended_reasoning"),
        }
    }
}

// =============================================================================
// CHAT TURNS
// =============================================================================

/// Identifier of a chat turn. Time-ordered (UUIDv7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        TurnId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub image: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    /// Assistant turn replaced by the fallback message after a failed reply.
    pub failed: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>, image: Option<Attachment>) -> Self {
        Self {
            id: TurnId::new(),
            role: Role::User,
            text: text.into(),
            image,
            created_at: Utc::now(),
            failed: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role: Role::Assistant,
            text: text.into(),
            image: None,
            created_at: Utc::now(),
            failed: false,
        }
    }

    /// Content parts for this turn: image first, then non-blank text.
    pub fn parts(&self) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(2);
        if let Some(ref image) = self.image {
            parts.push(image.to_part());
        }
        if !self.text.trim().is_empty() {
            parts.push(ContentPart::text(self.text.clone()));
        }
        parts
    }
}

// =============================================================================
// ORACLE REQUESTS
// =============================================================================

/// One role-tagged entry of a conversation sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContent {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

/// A single request to the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    /// Model identifier.
    pub model: String,
    /// System instruction (role and context).
    pub system_instruction: String,
    /// Conversation contents; a one-shot extraction has a single user entry.
    pub contents: Vec<ChatContent>,
    /// Declared JSON response schema, if the reply must be structured.
    pub response_schema: Option<serde_json::Value>,
    /// Optional thinking budget in tokens.
    pub thinking_budget: Option<u32>,
}

impl OracleRequest {
    /// Single-turn request carrying the given parts as user content.
    pub fn single(
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        parts: Vec<ContentPart>,
    ) -> Self {
        Self {
            model: model.into(),
            system_instruction: system_instruction.into(),
            contents: vec![ChatContent {
                role: Role::User,
                parts,
            }],
            response_schema: None,
            thinking_budget: None,
        }
    }

    /// Attach a response schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Attach a thinking budget.
    pub fn with_thinking_budget(mut self, budget: Option<u32>) -> Self {
        self.thinking_budget = budget;
        self
    }

    /// Total text length across all parts, for logging.
    pub fn prompt_len(&self) -> usize {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(ContentPart::len)
            .sum()
    }
}

// =============================================================================
// LIVE AUDIO
// =============================================================================

/// An outbound chunk of encoded microphone audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// An inbound message from the live transcription channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Incremental transcript of the user's speech.
    Transcript(String),
    /// The remote side considers the current turn complete.
    TurnComplete,
}
