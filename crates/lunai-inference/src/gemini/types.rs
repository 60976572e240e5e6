//! Gemini API request and response types.

use base64::Engine;
use serde::{Deserialize, Serialize};

use lunai_core::{ChatContent, ContentPart, OracleRequest, Role};

// =============================================================================
// GENERATE CONTENT TYPES
// =============================================================================

/// Request body for `generateContent` and `streamGenerateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// A role-tagged list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part: text or inline base64 data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Set on thought-summary parts; those are never shown as reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// Base64 payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Generation parameters.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Thinking budget configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

/// Speech synthesis configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Response from `generateContent`, also the payload of each SSE event.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Single response candidate.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Reported when the prompt itself was blocked.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated non-thought text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought.unwrap_or(false))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// First inline payload of the first candidate.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()))
    }

    /// Block reason, if the prompt was rejected.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiError,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

// =============================================================================
// LIVE TYPES
// =============================================================================

/// First client message on a live socket.
#[derive(Debug, Serialize)]
pub struct LiveSetupMessage {
    pub setup: LiveSetup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSetup {
    /// Fully qualified model name (`models/...`).
    pub model: String,
    /// Empty object enabling transcription of the user's audio.
    pub input_audio_transcription: serde_json::Map<String, serde_json::Value>,
}

/// Outbound realtime audio.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<InlineData>,
}

/// Inbound server message. Only the fields we act on are modelled.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerMessage {
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<&ContentPart> for Part {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => Part {
                text: Some(text.clone()),
                ..Default::default()
            },
            ContentPart::Inline { mime_type, data } => Part {
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                }),
                ..Default::default()
            },
        }
    }
}

impl From<&ChatContent> for Content {
    fn from(content: &ChatContent) -> Self {
        let role = match content.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        Content {
            role: Some(role.to_string()),
            parts: content.parts.iter().map(Part::from).collect(),
        }
    }
}

impl From<&OracleRequest> for GenerateContentRequest {
    fn from(request: &OracleRequest) -> Self {
        let system_instruction = if request.system_instruction.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.system_instruction.clone()),
                    ..Default::default()
                }],
            })
        };

        let generation_config =
            if request.response_schema.is_none() && request.thinking_budget.is_none() {
                None
            } else {
                Some(GenerationConfig {
                    response_mime_type: request
                        .response_schema
                        .as_ref()
                        .map(|_| "application/json".to_string()),
                    response_schema: request.response_schema.clone(),
                    thinking_config: request
                        .thinking_budget
                        .map(|thinking_budget| ThinkingConfig { thinking_budget }),
                    ..Default::default()
                })
            };

        GenerateContentRequest {
            system_instruction,
            contents: request.contents.iter().map(Content::from).collect(),
            generation_config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_with_schema() {
        let request = OracleRequest::single(
            "gemini-2.5-flash",
            "Be kind.",
            vec![
                ContentPart::inline("image/png", vec![1, 2, 3]),
                ContentPart::text("Describe this"),
            ],
        )
        .with_schema(serde_json::json!({"type": "OBJECT"}));

        let json = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["data"], "AQID");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "Describe this");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(json["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_request_serialization_thinking_budget() {
        let request = OracleRequest::single("gemini-2.5-pro", "", vec![ContentPart::text("hi")])
            .with_thinking_budget(Some(32768));
        let json = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            32768
        );
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_request_without_config_omits_generation_config() {
        let request = OracleRequest::single("m", "sys", vec![ContentPart::text("hi")]);
        let json = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_assistant_role_maps_to_model() {
        let content = ChatContent {
            role: Role::Assistant,
            parts: vec![ContentPart::text("Hello!")],
        };
        let wire = Content::from(&content);
        assert_eq!(wire.role.as_deref(), Some("model"));
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"},{"text":" there"}]},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Hello there");
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"pondering","thought":true},{"text":"answer"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "answer");
    }

    #[test]
    fn test_response_empty_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
        assert!(response.inline_data().is_none());
    }

    #[test]
    fn test_response_inline_data() {
        let json = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16;codec=pcm;rate=24000","data":"AAA="}}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let inline = response.inline_data().unwrap();
        assert_eq!(inline.data, "AAA=");
    }

    #[test]
    fn test_block_reason() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err: GeminiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(err.error.code, 400);
        assert_eq!(err.error.status, "INVALID_ARGUMENT");
    }
}
