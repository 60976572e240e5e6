//! The intent catalogue and typed responses for every supported task.

use serde::{Deserialize, Serialize};

use lunai_core::ModelTier;

use crate::intent::{ExtractionIntent, IntentKind, MediaKind};
use crate::schema::{FieldSpec, FieldType, OutputSchema};

macro_rules! family_law_context {
    () => {
        "As an expert in New Brunswick Family Law, your primary directive is the 'Child's Best Interest'. All outputs must prioritize the child's stability, safety, and well-being. Your goal is to produce objective, verifiable, and unalterable documentation for court compliance, demonstrating accountability and child-centric advocacy."
    };
}

/// Shared context prefixed to the legal-record intents.
pub const FAMILY_LAW_CONTEXT: &str = family_law_context!();

// =============================================================================
// CATEGORIES
// =============================================================================

/// Evidence log category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceCategory {
    Communication,
    Financial,
    Health,
    Legal,
    School,
    Other,
}

impl EvidenceCategory {
    pub const NAMES: &'static [&'static str] =
        &["Communication", "Financial", "Health", "Legal", "School", "Other"];
}

/// Expense category, by the child's need it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Health,
    Education,
    Extracurricular,
    Clothing,
    Food,
    Housing,
    Transportation,
    Other,
}

impl ExpenseCategory {
    pub const NAMES: &'static [&'static str] = &[
        "Health",
        "Education",
        "Extracurricular",
        "Clothing",
        "Food",
        "Housing",
        "Transportation",
        "Other",
    ];
}

// =============================================================================
// TYPED RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachResponse {
    pub revised_message: String,
    pub key_changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogResponse {
    pub title: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub summary: String,
    pub suggested_title: String,
    pub suggested_category: EvidenceCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceAnalysis {
    pub extracted_text: String,
    pub summary: String,
    pub suggested_title: String,
    pub suggested_category: EvidenceCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProposal {
    pub optimized_schedule: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategorization {
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepPlan {
    pub suggested_schedule: String,
    pub next_nap_time: String,
    pub sleep_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub summary: String,
}

// =============================================================================
// CATALOGUE
// =============================================================================

const COACH_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "revisedMessage",
        FieldType::String,
        "The revised, child-focused message.",
    ),
    FieldSpec::required(
        "keyChanges",
        FieldType::StringArray,
        "Objective reasons for each revision.",
    ),
];

pub const COACH: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::Coach,
    system_instruction: concat!(
        family_law_context!(),
        " You are the Child-First Coach. Rewrite accusatory language into collaborative, child-focused statements to satisfy 'good faith efforts' metrics."
    ),
    template: "Original message: \"{message}\". Please revise this message to be collaborative and child-focused. Also provide a list of key changes explaining the reasoning for each revision.",
    schema: OutputSchema::new(COACH_FIELDS),
    tier: ModelTier::Fast,
    media: MediaKind::None,
};

const ACTION_LOG_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "title",
        FieldType::String,
        "A concise title for the action item (e.g., 'Confirm dentist appointment').",
    ),
    FieldSpec::required(
        "type",
        FieldType::String,
        "The category of the action (e.g., 'Scheduling', 'Decision', 'Information Request').",
    ),
    FieldSpec::required(
        "details",
        FieldType::String,
        "A detailed, neutral description of the proposed action.",
    ),
];

pub const ACTION_LOG: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::ActionLog,
    system_instruction: concat!(
        family_law_context!(),
        " You are the Structured Action Log assistant. Your job is to turn informal chat requests into formally logged, actionable proposals to create an immutable communication record. Identify the core action being requested or proposed."
    ),
    template: "Analyze the following co-parenting chat message(s) and extract a single, clear, actionable item: \"{text}\"",
    schema: OutputSchema::new(ACTION_LOG_FIELDS),
    tier: ModelTier::Fast,
    media: MediaKind::None,
};

const DOCUMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "summary",
        FieldType::String,
        "A brief, factual summary of the document's content.",
    ),
    FieldSpec::required(
        "suggestedTitle",
        FieldType::String,
        "A concise, descriptive title for the evidence log.",
    ),
    FieldSpec::required(
        "suggestedCategory",
        FieldType::Enum(EvidenceCategory::NAMES),
        "The most appropriate category for this document.",
    ),
];

pub const DOCUMENT_ANALYSIS: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::DocumentAnalysis,
    system_instruction: concat!(
        family_law_context!(),
        " You are a Document Analyzer. Your role is to extract and categorize key facts for the Evidence Log, proving due diligence and creating a court-ready index of events. Provide a factual summary, a title, and a category."
    ),
    template: "Analyze the following text content and extract key information. Content: \"{content}\"",
    schema: OutputSchema::new(DOCUMENT_FIELDS),
    tier: ModelTier::Pro,
    media: MediaKind::None,
};

const EVIDENCE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "extractedText",
        FieldType::String,
        "All text extracted from the image. If no text, state 'No text found'.",
    ),
    FieldSpec::required(
        "summary",
        FieldType::String,
        "A brief, factual summary of the image's content (e.g., 'Receipt from Shoppers Drug Mart').",
    ),
    FieldSpec::required(
        "suggestedTitle",
        FieldType::String,
        "A concise, descriptive title for the evidence log.",
    ),
    FieldSpec::required(
        "suggestedCategory",
        FieldType::Enum(EvidenceCategory::NAMES),
        "The most appropriate category for this evidence.",
    ),
    FieldSpec::optional(
        "ocrConfidence",
        FieldType::Number,
        "A confidence score from 0.0 to 1.0 for the OCR accuracy. Omit if not applicable.",
    ),
];

pub const EVIDENCE_IMAGE_ANALYSIS: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::EvidenceImageAnalysis,
    system_instruction: concat!(
        family_law_context!(),
        " You are an Evidence Processor with OCR capabilities. Analyze the image to extract all text and provide a factual, objective description for a verifiable evidence log."
    ),
    template: "Analyze this image. If it contains text, extract it. Then, provide a factual summary of the image's content, a suggested title for an evidence log, and a category. If OCR is performed, also provide an OCR confidence score between 0.0 and 1.0.",
    schema: OutputSchema::new(EVIDENCE_FIELDS),
    tier: ModelTier::Fast,
    media: MediaKind::Image,
};

const SCHEDULE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "optimizedSchedule",
        FieldType::String,
        "The detailed weekly/bi-weekly plan, often in a markdown table format.",
    ),
    FieldSpec::required(
        "reasoning",
        FieldType::String,
        "A clear explanation of how this schedule serves the child's best interest based on the provided factors.",
    ),
];

pub const SCHEDULE_OPTIMIZE: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::ScheduleOptimize,
    system_instruction: concat!(
        family_law_context!(),
        " You are a Schedule Optimizer. Explicitly apply the highest standard: 'best interest of the child'. Create a detailed weekly or bi-weekly parenting plan that considers the child's routines, activities, and stability above all else. Provide clear reasoning."
    ),
    template: "Generate an optimized parenting schedule considering these factors:\n- Parental Needs: {parental_needs}\n- Child's Wellbeing Factors: {child_wellbeing}\n- External Factors: {external_factors}",
    schema: OutputSchema::new(SCHEDULE_FIELDS),
    tier: ModelTier::Pro,
    media: MediaKind::None,
};

const EXPENSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "category",
        FieldType::Enum(ExpenseCategory::NAMES),
        "The most appropriate category for the expense.",
    ),
    FieldSpec::optional(
        "amount",
        FieldType::Number,
        "The numerical amount of the expense, if found.",
    ),
    FieldSpec::optional(
        "currency",
        FieldType::String,
        "The currency of the expense (e.g., CAD), if found.",
    ),
];

pub const EXPENSE_CATEGORIZE: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::ExpenseCategorize,
    system_instruction: concat!(
        family_law_context!(),
        " You are an Expense Categorizer. Your purpose is to provide financial transparency for co-parenting. Categorize costs according to the child's needs for accurate reporting and contribution tracking. Extract the amount and currency if present."
    ),
    template: "Categorize the following expense: \"{description}\"",
    schema: OutputSchema::new(EXPENSE_FIELDS),
    tier: ModelTier::Fast,
    media: MediaKind::None,
};

const SLEEP_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(
        "suggestedSchedule",
        FieldType::String,
        "A detailed suggested daily sleep schedule, including wake-up, naps, and bedtime.",
    ),
    FieldSpec::required(
        "nextNapTime",
        FieldType::String,
        "The suggested time for the next nap based on the logs.",
    ),
    FieldSpec::required(
        "sleepTips",
        FieldType::StringArray,
        "A list of actionable tips to improve the child's sleep.",
    ),
];

// The sleep assistant is pediatric advice, not a legal record, so it carries
// no family-law prefix.
pub const SLEEP_SCHEDULE: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::SleepSchedule,
    system_instruction: "You are a pediatric Sleep Assistant. Your goal is to support the child's developmental needs by providing consistent and expert-informed sleep advice. Focus on creating a stable and predictable routine.",
    template: "Generate a sleep schedule recommendation based on the following:\n- Child's Age: {age_in_months} months\n- Recent Sleep Logs: \"{recent_logs}\"\n- Desired Schedule/Goals: \"{desired_schedule}\"",
    schema: OutputSchema::new(SLEEP_FIELDS),
    tier: ModelTier::Fast,
    media: MediaKind::None,
};

const VIDEO_FIELDS: &[FieldSpec] = &[FieldSpec::required(
    "summary",
    FieldType::String,
    "A factual summary of the video's content that answers the analysis prompt.",
)];

pub const VIDEO_ANALYSIS: ExtractionIntent = ExtractionIntent {
    kind: IntentKind::VideoAnalysis,
    system_instruction: concat!(
        family_law_context!(),
        " You are a Video Analyzer. Describe what the video shows in objective, factual terms suitable for a verifiable evidence log, focusing on what the user asks about."
    ),
    template: "{prompt}",
    schema: OutputSchema::new(VIDEO_FIELDS),
    tier: ModelTier::Pro,
    media: MediaKind::Video,
};

/// Every intent, in catalogue order.
pub const ALL_INTENTS: [&ExtractionIntent; 8] = [
    &COACH,
    &ACTION_LOG,
    &DOCUMENT_ANALYSIS,
    &EVIDENCE_IMAGE_ANALYSIS,
    &SCHEDULE_OPTIMIZE,
    &EXPENSE_CATEGORIZE,
    &SLEEP_SCHEDULE,
    &VIDEO_ANALYSIS,
];

/// Look up an intent by kind.
pub fn intent(kind: IntentKind) -> &'static ExtractionIntent {
    match kind {
        IntentKind::Coach => &COACH,
        IntentKind::ActionLog => &ACTION_LOG,
        IntentKind::DocumentAnalysis => &DOCUMENT_ANALYSIS,
        IntentKind::EvidenceImageAnalysis => &EVIDENCE_IMAGE_ANALYSIS,
        IntentKind::ScheduleOptimize => &SCHEDULE_OPTIMIZE,
        IntentKind::ExpenseCategorize => &EXPENSE_CATEGORIZE,
        IntentKind::SleepSchedule => &SLEEP_SCHEDULE,
        IntentKind::VideoAnalysis => &VIDEO_ANALYSIS,
    }
}
