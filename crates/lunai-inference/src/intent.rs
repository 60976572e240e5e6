//! Extraction intents: fixed task definitions driving one category of
//! structured extraction call.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use lunai_core::{ContentPart, Error, ModelTier, Result};

use crate::schema::OutputSchema;

/// Which supported task an intent describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Coach,
    ActionLog,
    DocumentAnalysis,
    EvidenceImageAnalysis,
    ScheduleOptimize,
    ExpenseCategorize,
    SleepSchedule,
    VideoAnalysis,
}

impl IntentKind {
    pub const ALL: [IntentKind; 8] = [
        IntentKind::Coach,
        IntentKind::ActionLog,
        IntentKind::DocumentAnalysis,
        IntentKind::EvidenceImageAnalysis,
        IntentKind::ScheduleOptimize,
        IntentKind::ExpenseCategorize,
        IntentKind::SleepSchedule,
        IntentKind::VideoAnalysis,
    ];

    /// Stable kebab-case name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Coach => "coach",
            IntentKind::ActionLog => "action-log",
            IntentKind::DocumentAnalysis => "document-analysis",
            IntentKind::EvidenceImageAnalysis => "evidence-image-analysis",
            IntentKind::ScheduleOptimize => "schedule-optimize",
            IntentKind::ExpenseCategorize => "expense-categorize",
            IntentKind::SleepSchedule => "sleep-schedule",
            IntentKind::VideoAnalysis => "video-analysis",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary content an intent requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Text only; binary parts are rejected.
    None,
    Image,
    Video,
}

impl MediaKind {
    /// MIME prefix a binary part must carry.
    pub fn mime_prefix(&self) -> Option<&'static str> {
        match self {
            MediaKind::None => None,
            MediaKind::Image => Some("image/"),
            MediaKind::Video => Some("video/"),
        }
    }

    fn missing_message(&self) -> &'static str {
        match self {
            MediaKind::None => "Please enter some text.",
            MediaKind::Image => "Please select an image to process.",
            MediaKind::Video => "Please select a video file to analyze.",
        }
    }

    fn wrong_type_message(&self) -> &'static str {
        match self {
            MediaKind::None => "This tool only accepts text.",
            MediaKind::Image => "Please select an image file.",
            MediaKind::Video => "Please select a video file.",
        }
    }
}

/// Immutable task definition: instruction, template, schema and model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionIntent {
    pub kind: IntentKind,
    /// Role and context instruction sent as the system instruction.
    pub system_instruction: &'static str,
    /// User-content template with `{name}` placeholders.
    pub template: &'static str,
    pub schema: OutputSchema,
    pub tier: ModelTier,
    pub media: MediaKind,
}

const PLACEHOLDER_PATTERN: &str = r"\{([a-z_][a-z0-9_]*)\}";

impl ExtractionIntent {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Placeholder names in template order (duplicates kept once).
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let Ok(re) = Regex::new(PLACEHOLDER_PATTERN) else {
            return names;
        };
        for caps in re.captures_iter(self.template) {
            if let Some(m) = caps.get(1) {
                if !names.contains(&m.as_str()) {
                    names.push(m.as_str());
                }
            }
        }
        names
    }

    /// Fill the template's placeholders.
    ///
    /// Every placeholder needs a value; a missing one is a validation error.
    /// Values are inserted verbatim.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let re = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| Error::Config(format!("Invalid placeholder pattern: {}", e)))?;
        let lookup: HashMap<&str, &str> = values.iter().copied().collect();

        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| !lookup.contains_key(name))
        {
            return Err(Error::InvalidInput(format!(
                "Missing value for `{}` in {} template",
                missing,
                self.name()
            )));
        }

        Ok(re
            .replace_all(self.template, |caps: &regex::Captures| {
                lookup.get(&caps[1]).copied().unwrap_or_default().to_string()
            })
            .into_owned())
    }

    /// Check that `parts` suit this intent, before any network call.
    pub fn validate_parts(&self, parts: &[ContentPart]) -> Result<()> {
        if parts.is_empty() {
            return Err(Error::InvalidInput(self.media.missing_message().to_string()));
        }

        match self.media.mime_prefix() {
            None => {
                if parts.iter().any(|p| matches!(p, ContentPart::Inline { .. })) {
                    return Err(Error::InvalidInput(
                        self.media.wrong_type_message().to_string(),
                    ));
                }
                let has_text = parts
                    .iter()
                    .any(|p| matches!(p, ContentPart::Text(_)) && !p.is_blank_text());
                if !has_text {
                    return Err(Error::InvalidInput(
                        self.media.missing_message().to_string(),
                    ));
                }
            }
            Some(prefix) => {
                let mut has_media = false;
                for part in parts {
                    if let Some(mime) = part.mime_type() {
                        if !mime.starts_with(prefix) {
                            return Err(Error::InvalidInput(
                                self.media.wrong_type_message().to_string(),
                            ));
                        }
                        has_media = true;
                    }
                }
                if !has_media {
                    return Err(Error::InvalidInput(
                        self.media.missing_message().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    const FIELDS: &[FieldSpec] = &[FieldSpec::required("summary", FieldType::String, "Summary.")];

    const SCHEMA: OutputSchema = OutputSchema::new(FIELDS);

    const TEXT_INTENT: ExtractionIntent = ExtractionIntent {
        kind: IntentKind::ScheduleOptimize,
        system_instruction: "sys",
        template: "Needs: {needs}\nWellbeing: {wellbeing}\nAgain: {needs}",
        schema: SCHEMA,
        tier: ModelTier::Pro,
        media: MediaKind::None,
    };

    const IMAGE_INTENT: ExtractionIntent = ExtractionIntent {
        kind: IntentKind::EvidenceImageAnalysis,
        system_instruction: "sys",
        template: "Describe this image.",
        schema: SCHEMA,
        tier: ModelTier::Fast,
        media: MediaKind::Image,
    };

    #[test]
    fn test_kind_names_unique() {
        let names: std::collections::HashSet<_> =
            IntentKind::ALL.iter().map(IntentKind::as_str).collect();
        assert_eq!(names.len(), IntentKind::ALL.len());
        assert_eq!(IntentKind::ExpenseCategorize.to_string(), "expense-categorize");
    }

    #[test]
    fn test_placeholders_in_order_deduplicated() {
        assert_eq!(TEXT_INTENT.placeholders(), vec!["needs", "wellbeing"]);
        assert!(IMAGE_INTENT.placeholders().is_empty());
    }

    #[test]
    fn test_render_fills_all_occurrences() {
        let text = TEXT_INTENT
            .render(&[("needs", "weekends"), ("wellbeing", "school nights")])
            .unwrap();
        assert_eq!(
            text,
            "Needs: weekends\nWellbeing: school nights\nAgain: weekends"
        );
    }

    #[test]
    fn test_render_does_not_reexpand_values() {
        let text = TEXT_INTENT
            .render(&[("needs", "{wellbeing}"), ("wellbeing", "x")])
            .unwrap();
        assert!(text.starts_with("Needs: {wellbeing}"));
    }

    #[test]
    fn test_render_missing_value() {
        let err = TEXT_INTENT.render(&[("needs", "weekends")]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("wellbeing"));
    }

    #[test]
    fn test_render_without_placeholders() {
        assert_eq!(IMAGE_INTENT.render(&[]).unwrap(), "Describe this image.");
    }

    #[test]
    fn test_validate_empty_parts() {
        assert!(TEXT_INTENT.validate_parts(&[]).is_err());
        assert!(IMAGE_INTENT.validate_parts(&[]).is_err());
    }

    #[test]
    fn test_validate_text_intent_needs_text() {
        let err = TEXT_INTENT
            .validate_parts(&[ContentPart::text("   ")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(TEXT_INTENT.validate_parts(&[ContentPart::text("hi")]).is_ok());
    }

    #[test]
    fn test_validate_text_intent_rejects_binary() {
        let parts = [
            ContentPart::text("hi"),
            ContentPart::inline("image/png", vec![1]),
        ];
        assert!(TEXT_INTENT.validate_parts(&parts).is_err());
    }

    #[test]
    fn test_validate_image_intent() {
        let ok = [
            ContentPart::inline("image/jpeg", vec![1]),
            ContentPart::text("Describe"),
        ];
        assert!(IMAGE_INTENT.validate_parts(&ok).is_ok());

        let image_only = [ContentPart::inline("image/heic", vec![1])];
        assert!(IMAGE_INTENT.validate_parts(&image_only).is_ok());
    }

    #[test]
    fn test_validate_image_intent_text_only() {
        let err = IMAGE_INTENT
            .validate_parts(&[ContentPart::text("Describe")])
            .unwrap_err();
        assert_eq!(err.user_message(), "Please select an image to process.");
    }

    #[test]
    fn test_validate_image_intent_wrong_mime() {
        let err = IMAGE_INTENT
            .validate_parts(&[ContentPart::inline("video/mp4", vec![1])])
            .unwrap_err();
        assert_eq!(err.user_message(), "Please select an image file.");
    }

    #[test]
    fn test_media_prefix() {
        assert_eq!(MediaKind::Image.mime_prefix(), Some("image/"));
        assert_eq!(MediaKind::Video.mime_prefix(), Some("video/"));
        assert_eq!(MediaKind::None.mime_prefix(), None);
    }
}
