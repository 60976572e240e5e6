//! Gemini-specific error handling.

use lunai_core::Error;

use super::types::GeminiErrorResponse;

/// Gemini error classes, derived from HTTP status and the `status` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// Missing, invalid or unauthorized API key.
    AuthenticationError,
    /// Quota or rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available for this key.
    ModelNotFound,
    /// Malformed request (bad schema, unsupported MIME type).
    InvalidArgument,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl GeminiErrorCode {
    /// Determine error code from HTTP status and the error `status` field.
    pub fn from_response(status: u16, error_status: &str) -> Self {
        match (status, error_status) {
            (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
                Self::AuthenticationError
            }
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::RateLimitExceeded,
            (404, _) | (_, "NOT_FOUND") => Self::ModelNotFound,
            (400, _) | (_, "INVALID_ARGUMENT") => Self::InvalidArgument,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable. Logged only; calls are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert a Gemini error to a LUNai error. Every remote failure is a
/// transport error; the message is preserved.
pub fn to_lunai_error(code: GeminiErrorCode, message: &str) -> Error {
    match code {
        GeminiErrorCode::AuthenticationError => {
            Error::Transport(format!("Authentication failed: {}", message))
        }
        GeminiErrorCode::RateLimitExceeded => {
            Error::Transport(format!("Rate limit exceeded: {}", message))
        }
        GeminiErrorCode::ModelNotFound => Error::Transport(format!("Model not found: {}", message)),
        GeminiErrorCode::InvalidArgument => {
            Error::Transport(format!("Invalid request: {}", message))
        }
        GeminiErrorCode::ServerError => Error::Transport(format!("Server error: {}", message)),
        GeminiErrorCode::Unknown => Error::Transport(message.to_string()),
    }
}

/// Map a non-success HTTP reply body to a LUNai error.
pub(crate) fn from_error_body(status: u16, body: &str) -> Error {
    let (error_status, message) = match serde_json::from_str::<GeminiErrorResponse>(body) {
        Ok(parsed) => (parsed.error.status, parsed.error.message),
        Err(_) if body.trim().is_empty() => (String::new(), format!("HTTP {}", status)),
        Err(_) => (String::new(), body.trim().to_string()),
    };
    let code = GeminiErrorCode::from_response(status, &error_status);
    tracing::debug!(
        status,
        error_status = %error_status,
        retryable = code.is_retryable(),
        "Gemini request failed"
    );
    to_lunai_error(code, &message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        let code = GeminiErrorCode::from_response(401, "UNAUTHENTICATED");
        assert_eq!(code, GeminiErrorCode::AuthenticationError);
    }

    #[test]
    fn test_error_code_from_403() {
        let code = GeminiErrorCode::from_response(403, "PERMISSION_DENIED");
        assert_eq!(code, GeminiErrorCode::AuthenticationError);
    }

    #[test]
    fn test_error_code_from_429() {
        let code = GeminiErrorCode::from_response(429, "RESOURCE_EXHAUSTED");
        assert_eq!(code, GeminiErrorCode::RateLimitExceeded);
    }

    #[test]
    fn test_error_code_from_404() {
        let code = GeminiErrorCode::from_response(404, "NOT_FOUND");
        assert_eq!(code, GeminiErrorCode::ModelNotFound);
    }

    #[test]
    fn test_error_code_from_400() {
        let code = GeminiErrorCode::from_response(400, "INVALID_ARGUMENT");
        assert_eq!(code, GeminiErrorCode::InvalidArgument);
    }

    #[test]
    fn test_error_code_from_503() {
        let code = GeminiErrorCode::from_response(503, "UNAVAILABLE");
        assert_eq!(code, GeminiErrorCode::ServerError);
    }

    #[test]
    fn test_error_code_from_unknown() {
        let code = GeminiErrorCode::from_response(418, "");
        assert_eq!(code, GeminiErrorCode::Unknown);
    }

    #[test]
    fn test_retryable() {
        assert!(GeminiErrorCode::RateLimitExceeded.is_retryable());
        assert!(GeminiErrorCode::ServerError.is_retryable());
        assert!(!GeminiErrorCode::AuthenticationError.is_retryable());
        assert!(!GeminiErrorCode::InvalidArgument.is_retryable());
    }

    #[test]
    fn test_to_lunai_error_is_transport() {
        let err = to_lunai_error(GeminiErrorCode::AuthenticationError, "API key not valid");
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("Authentication failed"));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_from_error_body_parses_json() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = from_error_body(429, body);
        assert!(err.to_string().contains("Rate limit exceeded: Quota exceeded"));
    }

    #[test]
    fn test_from_error_body_plain_text() {
        let err = from_error_body(502, "Bad Gateway");
        assert!(err.to_string().contains("Server error: Bad Gateway"));
    }

    #[test]
    fn test_from_error_body_empty() {
        let err = from_error_body(500, "");
        assert!(err.to_string().contains("HTTP 500"));
    }
}
