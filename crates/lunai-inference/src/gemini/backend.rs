//! Gemini REST backend: one-shot generation, SSE streaming and speech.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use lunai_core::defaults;
use lunai_core::{
    Error, GenerationBackend, ModelTier, OracleRequest, Result, SpeechBackend,
    StreamingGeneration, TokenStream,
};

use super::error::from_error_body;
use super::live::GeminiLive;
use super::streaming::parse_sse_stream;
use super::types::*;

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// REST base URL (without the version segment).
    pub base_url: String,
    /// Live websocket endpoint.
    pub live_url: String,
    /// Model for short extraction intents.
    pub fast_model: String,
    /// Model for long-form extraction intents.
    pub pro_model: String,
    /// Standard chat model.
    pub chat_model: String,
    /// Extended-reasoning chat model.
    pub reasoning_model: String,
    /// Speech synthesis model.
    pub tts_model: String,
    /// Prebuilt voice name.
    pub tts_voice: String,
    /// Live transcription model.
    pub live_model: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl GeminiConfig {
    /// Config with default endpoints and models for the given key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            live_url: defaults::GEMINI_LIVE_URL.to_string(),
            fast_model: defaults::FAST_MODEL.to_string(),
            pro_model: defaults::PRO_MODEL.to_string(),
            chat_model: defaults::CHAT_MODEL.to_string(),
            reasoning_model: defaults::REASONING_MODEL.to_string(),
            tts_model: defaults::TTS_MODEL.to_string(),
            tts_voice: defaults::TTS_VOICE.to_string(),
            live_model: defaults::LIVE_MODEL.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECS,
        }
    }

    /// Load from environment variables (and `.env`, if present).
    ///
    /// Fails with [`Error::Config`] when no API key is set.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var(defaults::ENV_API_KEY)
            .or_else(|_| std::env::var(defaults::ENV_API_KEY_FALLBACK))
            .map_err(|_| {
                Error::Config(format!(
                    "{} is not set. AI features are unavailable.",
                    defaults::ENV_API_KEY
                ))
            })?;

        let var_or = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        let config = Self {
            api_key,
            base_url: var_or(defaults::ENV_BASE_URL, defaults::GEMINI_BASE_URL),
            live_url: var_or(defaults::ENV_LIVE_URL, defaults::GEMINI_LIVE_URL),
            fast_model: var_or(defaults::ENV_FAST_MODEL, defaults::FAST_MODEL),
            pro_model: var_or(defaults::ENV_PRO_MODEL, defaults::PRO_MODEL),
            chat_model: var_or(defaults::ENV_CHAT_MODEL, defaults::CHAT_MODEL),
            reasoning_model: var_or(defaults::ENV_REASONING_MODEL, defaults::REASONING_MODEL),
            tts_model: var_or(defaults::ENV_TTS_MODEL, defaults::TTS_MODEL),
            tts_voice: var_or(defaults::ENV_TTS_VOICE, defaults::TTS_VOICE),
            live_model: var_or(defaults::ENV_LIVE_MODEL, defaults::LIVE_MODEL),
            timeout_seconds: std::env::var(defaults::ENV_TIMEOUT_SECS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::REQUEST_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never produce a working call.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("API key is empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Base URL must be http(s): {}",
                self.base_url
            )));
        }
        if !(self.live_url.starts_with("ws://") || self.live_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "Live URL must be ws(s): {}",
                self.live_url
            )));
        }
        let models = [
            ("fast_model", &self.fast_model),
            ("pro_model", &self.pro_model),
            ("chat_model", &self.chat_model),
            ("reasoning_model", &self.reasoning_model),
            ("tts_model", &self.tts_model),
            ("live_model", &self.live_model),
        ];
        for (name, value) in models {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} is empty", name)));
            }
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("timeout_seconds must be positive".to_string()));
        }
        Ok(())
    }

    /// Model serving the given extraction tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Pro => &self.pro_model,
        }
    }
}

/// Gemini REST backend.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Create a backend; the configuration is validated here.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        // Streams may legitimately outlast the timeout, so the client only
        // bounds connecting and idle reads. One-shot calls add a total deadline.
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            base_url = %config.base_url,
            fast = %config.fast_model,
            pro = %config.pro_model,
            chat = %config.chat_model,
            "Initializing Gemini backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Live audio endpoint sharing this backend's credential.
    pub fn live(&self) -> GeminiLive {
        GeminiLive::new(
            self.config.live_url.clone(),
            self.config.api_key.clone(),
            self.config.live_model.clone(),
        )
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}{}",
            self.config.base_url.trim_end_matches('/'),
            defaults::GEMINI_API_VERSION,
            endpoint
        )
    }

    /// Build an authenticated POST for `models/{model}:{method}`.
    fn build_request(&self, model: &str, method: &str) -> reqwest::RequestBuilder {
        let url = self.api_url(&format!("/models/{}:{}", model, method));
        self.client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
    }

    /// Send a generateContent body and parse the reply.
    async fn send_generate<B: serde::Serialize + ?Sized>(
        &self,
        model: &str,
        body: &B,
    ) -> Result<GenerateContentResponse> {
        let response = self
            .build_request(model, "generateContent")
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(from_error_body(status, &body));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse response: {}", e)))?;

        if let Some(reason) = result.block_reason() {
            return Err(Error::Transport(format!("Prompt blocked: {}", reason)));
        }
        Ok(result)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    #[instrument(
        skip(self, request),
        fields(subsystem = "inference", component = "gemini", op = "generate", model = %request.model)
    )]
    async fn generate(&self, request: OracleRequest) -> Result<String> {
        let start = Instant::now();
        debug!(
            prompt_len = request.prompt_len(),
            structured = request.response_schema.is_some(),
            "Generating"
        );

        let body = GenerateContentRequest::from(&request);
        let result = self.send_generate(&request.model, &body).await?;
        let content = result.text();

        debug!(
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(content)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.api_url("/models"))
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(Duration::from_secs(defaults::HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Gemini health check passed");
                    Ok(true)
                } else {
                    warn!("Gemini health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Gemini health check error: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl StreamingGeneration for GeminiBackend {
    #[instrument(
        skip(self, request),
        fields(subsystem = "inference", component = "gemini", op = "stream", model = %request.model)
    )]
    async fn generate_stream(&self, request: OracleRequest) -> Result<TokenStream> {
        debug!(
            prompt_len = request.prompt_len(),
            turns = request.contents.len(),
            "Streaming generation"
        );

        let body = GenerateContentRequest::from(&request);
        let response = self
            .build_request(&request.model, "streamGenerateContent")
            .query(&[("alt", "sse")])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(from_error_body(status, &body));
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl SpeechBackend for GeminiBackend {
    #[instrument(
        skip(self, text),
        fields(subsystem = "inference", component = "gemini", op = "synthesize")
    )]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let body = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                    ..Default::default()
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.tts_voice.clone(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        let result = self.send_generate(&self.config.tts_model, &body).await?;
        let inline = result
            .inline_data()
            .ok_or_else(|| Error::Audio("No audio data received.".to_string()))?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| Error::Audio(format!("Invalid base64 audio: {}", e)))?;

        debug!(
            audio_bytes = audio.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Speech synthesized"
        );
        Ok(audio)
    }

    fn sample_rate(&self) -> u32 {
        defaults::TTS_SAMPLE_RATE
    }

    fn channels(&self) -> u16 {
        defaults::TTS_CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeminiConfig::with_api_key("test-key");
        assert_eq!(config.base_url, defaults::GEMINI_BASE_URL);
        assert_eq!(config.fast_model, "gemini-2.5-flash");
        assert_eq!(config.pro_model, "gemini-2.5-pro");
        assert_eq!(config.chat_model, "gemini-2.5-flash-lite");
        assert_eq!(config.tts_voice, "Kore");
        assert_eq!(config.timeout_seconds, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_for_tier() {
        let config = GeminiConfig::with_api_key("k");
        assert_eq!(config.model_for(ModelTier::Fast), defaults::FAST_MODEL);
        assert_eq!(config.model_for(ModelTier::Pro), defaults::PRO_MODEL);
    }

    #[test]
    fn test_validate_empty_key() {
        let config = GeminiConfig::with_api_key("  ");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let config = GeminiConfig {
            base_url: "ftp://example.com".to_string(),
            ..GeminiConfig::with_api_key("k")
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_bad_live_url() {
        let config = GeminiConfig {
            live_url: "https://example.com".to_string(),
            ..GeminiConfig::with_api_key("k")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_model() {
        let config = GeminiConfig {
            pro_model: String::new(),
            ..GeminiConfig::with_api_key("k")
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pro_model"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = GeminiConfig {
            timeout_seconds: 0,
            ..GeminiConfig::with_api_key("k")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_creation_rejects_invalid_config() {
        let result = GeminiBackend::new(GeminiConfig::with_api_key(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_api_url() {
        let config = GeminiConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..GeminiConfig::with_api_key("k")
        };
        let backend = GeminiBackend::new(config).unwrap();
        assert_eq!(backend.api_url("/models"), "http://localhost:9000/v1beta/models");
    }

    #[test]
    fn test_speech_format() {
        let backend = GeminiBackend::new(GeminiConfig::with_api_key("k")).unwrap();
        assert_eq!(backend.sample_rate(), 24_000);
        assert_eq!(backend.channels(), 1);
    }
}
