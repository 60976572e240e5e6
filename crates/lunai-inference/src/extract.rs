//! Structured extraction client.
//!
//! One call per user action: validate the inputs, build a schema-constrained
//! request for the intent, issue exactly one oracle call and decode the reply
//! into a typed response. No retries, no caching, no state across calls.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use lunai_core::{defaults, ContentPart, Error, GenerationBackend, ModelTier, OracleRequest, Result};

use crate::gemini::{GeminiBackend, GeminiConfig};
use crate::intent::ExtractionIntent;
use crate::intents::{
    ActionLogResponse, CoachResponse, DocumentAnalysis, EvidenceAnalysis, ExpenseCategorization,
    ScheduleProposal, SleepPlan, VideoAnalysis, ACTION_LOG, COACH, DOCUMENT_ANALYSIS,
    EVIDENCE_IMAGE_ANALYSIS, EXPENSE_CATEGORIZE, SCHEDULE_OPTIMIZE, SLEEP_SCHEDULE,
    VIDEO_ANALYSIS,
};
use crate::parse::decode_validated;

/// Result of a structured extraction.
pub type ExtractionResult<T> = Result<T>;

/// A validated extraction request. Constructed per call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    intent: &'a ExtractionIntent,
    parts: Vec<ContentPart>,
}

impl<'a> ExtractionRequest<'a> {
    /// Validate `parts` against the intent's input rules.
    pub fn new(intent: &'a ExtractionIntent, parts: Vec<ContentPart>) -> Result<Self> {
        intent.validate_parts(&parts)?;
        Ok(Self { intent, parts })
    }

    pub fn intent(&self) -> &ExtractionIntent {
        self.intent
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    /// Build the oracle request for the given model.
    pub fn into_oracle_request(self, model: &str) -> OracleRequest {
        OracleRequest::single(model, self.intent.system_instruction, self.parts)
            .with_schema(self.intent.schema.to_json())
    }
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(message.to_string()));
    }
    Ok(())
}

/// Client for prompt-templated structured extraction.
#[derive(Clone)]
pub struct ExtractionClient {
    backend: Arc<dyn GenerationBackend>,
    fast_model: String,
    pro_model: String,
}

impl ExtractionClient {
    /// Create a client over any generation backend, with the default models.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            fast_model: defaults::FAST_MODEL.to_string(),
            pro_model: defaults::PRO_MODEL.to_string(),
        }
    }

    /// Override the tier models.
    pub fn with_models(mut self, fast: impl Into<String>, pro: impl Into<String>) -> Self {
        self.fast_model = fast.into();
        self.pro_model = pro.into();
        self
    }

    /// Create a Gemini-backed client from a validated configuration.
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let fast = config.fast_model.clone();
        let pro = config.pro_model.clone();
        let backend = GeminiBackend::new(config)?;
        Ok(Self::new(Arc::new(backend)).with_models(fast, pro))
    }

    /// Create a Gemini-backed client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env()?)
    }

    /// Model serving an extraction tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Pro => &self.pro_model,
        }
    }

    /// Check the backend is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    /// Run one extraction for `intent` over `parts`.
    ///
    /// Validation errors are returned before any network call. A reply that
    /// is not valid for the intent's schema is a schema violation carrying the
    /// raw reply.
    pub async fn extract<T: DeserializeOwned>(
        &self,
        intent: &ExtractionIntent,
        parts: Vec<ContentPart>,
    ) -> ExtractionResult<T> {
        let request = ExtractionRequest::new(intent, parts)?;
        self.extract_request(request).await
    }

    /// Run a request that was already validated.
    #[instrument(
        skip(self, request),
        fields(subsystem = "inference", component = "extraction", op = "extract", intent = %request.intent().name())
    )]
    pub async fn extract_request<T: DeserializeOwned>(
        &self,
        request: ExtractionRequest<'_>,
    ) -> ExtractionResult<T> {
        let start = Instant::now();
        let intent = *request.intent();
        let model = self.model_for(intent.tier).to_string();
        let oracle_request = request.into_oracle_request(&model);
        debug!(
            model = %model,
            prompt_len = oracle_request.prompt_len(),
            "Sending extraction request"
        );

        let raw = self.backend.generate(oracle_request).await?;

        match decode_validated::<T>(&raw, &intent.schema) {
            Ok(value) => {
                debug!(
                    response_len = raw.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    success = true,
                    "Extraction complete"
                );
                Ok(value)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_len = raw.len(),
                    "Extraction reply failed schema validation"
                );
                Err(e)
            }
        }
    }

    // =========================================================================
    // TYPED OPERATIONS
    // =========================================================================

    /// Rewrite a message into collaborative, child-focused language.
    pub async fn improve_communication(&self, message: &str) -> ExtractionResult<CoachResponse> {
        require(message, "Please enter a message to revise.")?;
        let text = COACH.render(&[("message", message)])?;
        self.extract(&COACH, vec![ContentPart::text(text)]).await
    }

    /// Turn informal chat messages into one logged action item.
    pub async fn create_structured_action(&self, text: &str) -> ExtractionResult<ActionLogResponse> {
        require(text, "Please enter chat messages to analyze.")?;
        let prompt = ACTION_LOG.render(&[("text", text)])?;
        self.extract(&ACTION_LOG, vec![ContentPart::text(prompt)]).await
    }

    /// Summarize, title and categorize document text for the evidence log.
    pub async fn analyze_document_text(&self, content: &str) -> ExtractionResult<DocumentAnalysis> {
        require(content, "Please enter document text to analyze.")?;
        let prompt = DOCUMENT_ANALYSIS.render(&[("content", content)])?;
        self.extract(&DOCUMENT_ANALYSIS, vec![ContentPart::text(prompt)])
            .await
    }

    /// OCR and describe an evidence image. The MIME type is forwarded as given.
    pub async fn process_evidence_image(
        &self,
        data: Vec<u8>,
        mime_type: &str,
    ) -> ExtractionResult<EvidenceAnalysis> {
        let directive = EVIDENCE_IMAGE_ANALYSIS.render(&[])?;
        let parts = vec![
            ContentPart::inline(mime_type, data),
            ContentPart::text(directive),
        ];
        self.extract(&EVIDENCE_IMAGE_ANALYSIS, parts).await
    }

    /// Propose a parenting schedule. External factors may be blank.
    pub async fn optimize_schedule(
        &self,
        parental_needs: &str,
        child_wellbeing: &str,
        external_factors: &str,
    ) -> ExtractionResult<ScheduleProposal> {
        if parental_needs.trim().is_empty() || child_wellbeing.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Please fill in at least Parental Needs and Child's Wellbeing factors.".to_string(),
            ));
        }
        let prompt = SCHEDULE_OPTIMIZE.render(&[
            ("parental_needs", parental_needs),
            ("child_wellbeing", child_wellbeing),
            ("external_factors", external_factors),
        ])?;
        self.extract(&SCHEDULE_OPTIMIZE, vec![ContentPart::text(prompt)])
            .await
    }

    /// Categorize an expense and pull out its amount and currency, if stated.
    pub async fn categorize_expense(
        &self,
        description: &str,
    ) -> ExtractionResult<ExpenseCategorization> {
        require(description, "Please enter an expense description.")?;
        let prompt = EXPENSE_CATEGORIZE.render(&[("description", description)])?;
        self.extract(&EXPENSE_CATEGORIZE, vec![ContentPart::text(prompt)])
            .await
    }

    /// Recommend a sleep schedule. The desired schedule may be blank.
    pub async fn sleep_schedule(
        &self,
        age_in_months: u32,
        recent_logs: &str,
        desired_schedule: &str,
    ) -> ExtractionResult<SleepPlan> {
        if age_in_months == 0 {
            return Err(Error::InvalidInput(
                "Please enter a valid age in months.".to_string(),
            ));
        }
        require(recent_logs, "Please provide recent sleep logs.")?;
        let age = age_in_months.to_string();
        let prompt = SLEEP_SCHEDULE.render(&[
            ("age_in_months", age.as_str()),
            ("recent_logs", recent_logs),
            ("desired_schedule", desired_schedule),
        ])?;
        self.extract(&SLEEP_SCHEDULE, vec![ContentPart::text(prompt)])
            .await
    }

    /// Summarize a video as directed by `prompt`.
    pub async fn analyze_video(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        prompt: &str,
    ) -> ExtractionResult<VideoAnalysis> {
        require(prompt, "Please enter a prompt for the analysis.")?;
        let directive = VIDEO_ANALYSIS.render(&[("prompt", prompt)])?;
        let parts = vec![
            ContentPart::inline(mime_type, data),
            ContentPart::text(directive),
        ];
        self.extract(&VIDEO_ANALYSIS, parts).await
    }
}
