use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Language used when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Request value asking the service to detect the language from the text
pub const AUTO_LANGUAGE: &str = "auto";

/// ISO 639-1 codes the service can detect on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl LanguageCode {
    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Building a detector loads language models, so share a single one
static DETECTOR: Lazy<LanguageDetector> = Lazy::new(|| {
    LanguageDetectorBuilder::from_languages(&[
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ])
    .build()
});

/// Detect the language of the given text, defaulting to English
pub fn detect_language(text: &str) -> LanguageCode {
    match DETECTOR.detect_language_of(text) {
        Some(language) => LanguageCode::from_lingua(language),
        None => {
            tracing::warn!("Could not detect language, falling back to English");
            LanguageCode::English
        }
    }
}

/// Normalise a requested language into the code handed to engines.
///
/// Absent or blank values become `"en"`, `"auto"` is resolved by detection
/// and anything else is lower-cased. Whether the engine recognises the code
/// is the engine's concern.
pub fn normalize_language(requested: Option<&str>, text: &str) -> String {
    match requested.map(str::trim) {
        None | Some("") => DEFAULT_LANGUAGE.to_string(),
        Some(code) if code.eq_ignore_ascii_case(AUTO_LANGUAGE) => {
            let detected = detect_language(text);
            tracing::info!(language_detected = %detected, "Language detected for synthesis");
            detected.as_str().to_string()
        }
        Some(code) => code.to_lowercase(),
    }
}
