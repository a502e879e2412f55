use std::fmt;

use serde::{Deserialize, Serialize};

/// One call into the image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub iteration: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, iteration: u32) -> Self {
        Self {
            prompt: prompt.into(),
            iteration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub critique: String,
    pub accepted: bool,
    pub score: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub request: GenerationRequest,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Any text the image model returned alongside the image.
    pub model_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    pub iteration: u32,
    pub prompt: String,
    pub review: ReviewResult,
    pub image_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IterativeOutcome {
    /// The accepted image, or the last one produced when the budget ran out.
    pub image: GeneratedImage,
    pub iterations: u32,
    pub accepted: bool,
    pub history: Vec<IterationRecord>,
    pub images: Vec<GeneratedImage>,
}

/// Target publication type; selects the default review threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DocType {
    Journal,
    Conference,
    Thesis,
    Grant,
    Preprint,
    Report,
    Poster,
    Presentation,
    #[default]
    Default,
}

impl DocType {
    pub fn quality_threshold(self) -> f32 {
        match self {
            DocType::Journal => 8.5,
            DocType::Conference | DocType::Thesis | DocType::Grant => 8.0,
            DocType::Preprint | DocType::Report | DocType::Default => 7.5,
            DocType::Poster => 7.0,
            DocType::Presentation => 6.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Journal => "journal",
            DocType::Conference => "conference",
            DocType::Thesis => "thesis",
            DocType::Grant => "grant",
            DocType::Preprint => "preprint",
            DocType::Report => "report",
            DocType::Poster => "poster",
            DocType::Presentation => "presentation",
            DocType::Default => "default",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_follow_publication_strictness() {
        assert_eq!(DocType::Journal.quality_threshold(), 8.5);
        assert_eq!(DocType::Grant.quality_threshold(), 8.0);
        assert_eq!(DocType::default().quality_threshold(), 7.5);
        assert_eq!(DocType::Presentation.quality_threshold(), 6.5);
    }

    #[test]
    fn doc_type_names_match_cli_values() {
        use clap::ValueEnum;
        for doc in DocType::value_variants() {
            let value = doc.to_possible_value().unwrap();
            assert_eq!(value.get_name(), doc.as_str());
        }
    }
}
