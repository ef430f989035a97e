use crate::domain::tts::{EngineKind, SynthesisOptions, VoiceEmbedding};
use crate::infrastructure::audio::{validate_wav, write_atomic, AudioClip, AudioError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Failure inside an engine adapter.
///
/// The dispatcher wraps these with the engine's display name before they
/// reach a client.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("engine returned {status}: {message}")]
    Engine { status: u16, message: String },

    #[error("failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("engine returned invalid audio: {0}")]
    InvalidAudio(String),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Turns text into a WAV file.
///
/// Implementations must leave either a complete WAV or nothing at
/// `output_path`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn engine_name(&self) -> &'static str;

    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError>;

    /// Text longer than this many characters goes through
    /// [`Synthesizer::synthesize_long_form`]
    fn long_form_threshold(&self) -> Option<usize> {
        None
    }

    async fn synthesize_long_form(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.synthesize(text, output_path, options).await
    }

    /// Whether the engine honours `options.speed` itself
    fn applies_speed(&self) -> bool {
        false
    }

    /// Whether the engine has already loaded `model`
    async fn is_loaded(&self, model: &str) -> bool;
}

#[async_trait]
pub trait SpeakerAware: Send + Sync {
    async fn list_speakers(&self, model: &str) -> Result<Vec<String>, EngineError>;
}

#[async_trait]
pub trait LanguageAware: Send + Sync {
    async fn list_languages(&self, model: &str) -> Result<Vec<String>, EngineError>;
}

#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn extract_embedding(&self, reference_audio: &Path) -> Result<VoiceEmbedding, EngineError>;
}

#[async_trait]
pub trait EngineHealth: Send + Sync {
    /// Cheap reachability check, never loads models
    async fn probe(&self) -> Result<(), EngineError>;
}

/// Validate engine output and move it into place atomically
pub(crate) fn persist_wav(bytes: &[u8], output_path: &Path) -> Result<(), EngineError> {
    validate_wav(bytes).map_err(|e| EngineError::InvalidAudio(e.to_string()))?;
    write_atomic(output_path, bytes)?;
    Ok(())
}

/// Join per-chunk WAVs in order into one WAV
pub(crate) fn concat_wavs(parts: Vec<Vec<u8>>) -> Result<Vec<u8>, EngineError> {
    let clips = parts
        .iter()
        .map(|bytes| AudioClip::from_wav_bytes(bytes).map_err(|e| EngineError::InvalidAudio(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AudioClip::concat(clips)?.to_wav_bytes()?)
}

/// One configured engine and the capabilities it offers
#[derive(Clone)]
pub struct EngineHandle {
    pub kind: EngineKind,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub speakers: Option<Arc<dyn SpeakerAware>>,
    pub languages: Option<Arc<dyn LanguageAware>>,
    pub embeddings: Option<Arc<dyn EmbeddingExtractor>>,
    pub health: Option<Arc<dyn EngineHealth>>,
}

impl EngineHandle {
    pub fn new(kind: EngineKind, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            kind,
            synthesizer,
            speakers: None,
            languages: None,
            embeddings: None,
            health: None,
        }
    }

    pub fn with_speakers(mut self, speakers: Arc<dyn SpeakerAware>) -> Self {
        self.speakers = Some(speakers);
        self
    }

    pub fn with_languages(mut self, languages: Arc<dyn LanguageAware>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn EmbeddingExtractor>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_health(mut self, health: Arc<dyn EngineHealth>) -> Self {
        self.health = Some(health);
        self
    }
}

/// Engines configured at startup, keyed by kind. Unregistered kinds are
/// reported as unavailable.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: HashMap<EngineKind, EngineHandle>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handle: EngineHandle) -> Self {
        tracing::info!(engine = handle.kind.key(), "Engine registered");
        self.engines.insert(handle.kind, handle);
        self
    }

    pub fn get(&self, kind: EngineKind) -> Option<&EngineHandle> {
        self.engines.get(&kind)
    }

    pub fn is_available(&self, kind: EngineKind) -> bool {
        self.engines.contains_key(&kind)
    }

    /// Registered engines in [`EngineKind::ALL`] order
    pub fn handles(&self) -> impl Iterator<Item = &EngineHandle> {
        EngineKind::ALL.iter().filter_map(|kind| self.engines.get(kind))
    }
}
