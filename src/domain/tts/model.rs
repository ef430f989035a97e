use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const BARK_ALIASES: &[&str] = &["bark", "tts_models/multilingual/bark"];
pub const OPENVOICE_ALIASES: &[&str] = &["openvoice", "tts_models/multilingual/openvoice"];

/// Canonical identifiers advertised by `GET /models`
pub const BARK_MODEL_ID: &str = "tts_models/multilingual/bark";
pub const OPENVOICE_MODEL_ID: &str = "tts_models/multilingual/openvoice";

/// The three kinds of backend engine the dispatcher can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Multi-model engine where the model is chosen by name
    Generic,
    /// Expressive engine with fixed per-language voice presets
    PresetVoice,
    /// Engine that clones a voice from reference audio
    Cloning,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [EngineKind::Generic, EngineKind::PresetVoice, EngineKind::Cloning];

    /// Human readable backend name used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineKind::Generic => "Coqui TTS",
            EngineKind::PresetVoice => "Bark",
            EngineKind::Cloning => "OpenVoice",
        }
    }

    /// Short key used in readiness reports and logs
    pub fn key(&self) -> &'static str {
        match self {
            EngineKind::Generic => "coqui",
            EngineKind::PresetVoice => "bark",
            EngineKind::Cloning => "openvoice",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A resolved model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    Generic(String),
    PresetVoice,
    Cloning,
}

impl ModelSelection {
    /// Resolve a requested model identifier.
    ///
    /// Engine aliases map to their engine; names in the generic catalogue are
    /// used as-is; absent, empty and unknown identifiers fall back to the
    /// generic default model.
    pub fn resolve(identifier: Option<&str>, generic_models: &[String], default_model: &str) -> Self {
        let identifier = match identifier.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => return ModelSelection::Generic(default_model.to_string()),
        };

        if BARK_ALIASES.contains(&identifier) {
            return ModelSelection::PresetVoice;
        }
        if OPENVOICE_ALIASES.contains(&identifier) {
            return ModelSelection::Cloning;
        }
        if identifier == default_model || generic_models.iter().any(|m| m == identifier) {
            return ModelSelection::Generic(identifier.to_string());
        }

        tracing::warn!(
            requested_model = %identifier,
            fallback_model = %default_model,
            "Unknown model identifier, falling back to default model"
        );
        ModelSelection::Generic(default_model.to_string())
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            ModelSelection::Generic(_) => EngineKind::Generic,
            ModelSelection::PresetVoice => EngineKind::PresetVoice,
            ModelSelection::Cloning => EngineKind::Cloning,
        }
    }

    /// Label used for logging and for the generic engine's model argument
    pub fn model_name(&self) -> &str {
        match self {
            ModelSelection::Generic(name) => name,
            ModelSelection::PresetVoice => BARK_MODEL_ID,
            ModelSelection::Cloning => OPENVOICE_MODEL_ID,
        }
    }
}

/// Speaker as submitted by a client: JSON allows either a label or an index.
///
/// Any other JSON value is kept as `Other` and treated as no speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeakerInput {
    Index(u32),
    Label(String),
    Other(serde_json::Value),
}

impl SpeakerInput {
    /// Raw label, as passed to engines that know speakers by name
    pub fn label(&self) -> Option<String> {
        match self {
            SpeakerInput::Index(index) => Some(index.to_string()),
            SpeakerInput::Label(label) => Some(label.trim().to_string()),
            SpeakerInput::Other(_) => None,
        }
    }

    /// Extract a preset index from "Speaker 6" or "6".
    ///
    /// Anything non-numeric means "no preset selected".
    pub fn preset_index(&self) -> Option<u32> {
        match self {
            SpeakerInput::Index(index) => Some(*index),
            SpeakerInput::Label(label) => {
                let label = label.trim();
                let digits = match label.get(..8) {
                    Some(prefix) if prefix.eq_ignore_ascii_case("speaker ") => &label[8..],
                    _ => label,
                };
                digits.trim().parse::<u32>().ok()
            }
            SpeakerInput::Other(_) => None,
        }
    }

    /// Treat blank labels and unusable values as absent
    pub fn non_empty(self) -> Option<Self> {
        match &self {
            SpeakerInput::Label(label) if label.trim().is_empty() => None,
            SpeakerInput::Other(value) => {
                tracing::debug!(speaker = %value, "Ignoring speaker that is neither a label nor an index");
                None
            }
            _ => Some(self),
        }
    }
}

/// A validated-at-dispatch synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub model: Option<String>,
    pub speaker: Option<SpeakerInput>,
    pub language: Option<String>,
    pub speed: f32,
    pub reference_audio: Option<PathBuf>,
    pub output_path: PathBuf,
}

/// Engine-facing options after dispatcher normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Generic engine model name
    pub model: Option<String>,
    /// Named speaker for engines that know speakers by label
    pub speaker: Option<String>,
    /// Preset index for preset-voice engines
    pub preset: Option<u32>,
    /// ISO-639-1-ish language code, never empty
    pub language: String,
    pub speed: f32,
    pub reference_audio: Option<PathBuf>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            model: None,
            speaker: None,
            preset: None,
            language: "en".to_string(),
            speed: 1.0,
            reference_audio: None,
        }
    }
}

/// Opaque voice vector produced by a cloning engine from reference audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceEmbedding(pub Vec<f32>);

impl VoiceEmbedding {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a successful dispatch
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub path: PathBuf,
    pub engine: EngineKind,
    pub model: String,
    pub long_form: bool,
    pub speed_adjusted: bool,
}

/// Model introspection summary for `GET /model-info`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub speakers: Vec<String>,
    pub languages: Vec<String>,
    pub loaded: bool,
}
