//! Reply decoding: fence stripping, then schema-validated deserialization.

use serde::de::DeserializeOwned;
use serde_json::Value;

use lunai_core::{Error, Result};

use crate::schema::OutputSchema;

/// Remove a surrounding Markdown code fence and whitespace.
///
/// Handles ```` ```json ```` and bare ```` ``` ```` openers. Unfenced text is
/// returned trimmed and otherwise unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Decode an oracle reply into `T`.
///
/// The reply is fence-stripped, parsed as JSON, checked against `schema`
/// (required fields, types, enum membership) and only then deserialized.
/// Every failure is a [`Error::SchemaViolation`] carrying the untouched reply.
pub fn decode_validated<T: DeserializeOwned>(raw: &str, schema: &OutputSchema) -> Result<T> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(Error::schema("Reply is empty", raw));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::schema(format!("Reply is not valid JSON: {}", e), raw))?;

    schema.validate(&value, raw)?;

    serde_json::from_value(value)
        .map_err(|e| Error::schema(format!("Reply does not match the declared shape: {}", e), raw))
}
