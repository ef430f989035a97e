use super::engine_client::EngineClient;
use super::tts_repository::{persist_wav, EngineError, EngineHealth, LanguageAware, SpeakerAware, Synthesizer};
use crate::domain::tts::SynthesisOptions;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Languages offered for models that do not declare their own
pub const FALLBACK_LANGUAGES: &[&str] = &["en", "es", "fr", "de", "it", "pt", "ru", "zh"];

/// Model families that always take a language argument
const MULTILINGUAL_MARKERS: &[&str] = &["xtts", "your_tts"];

/// What the engine reports once a model is in memory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadedModel {
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Adapter for a multi-model Coqui TTS server. Models are loaded on first
/// use and kept for the life of the process.
pub struct CoquiTtsRepository {
    client: EngineClient,
    models: Cache<String, Arc<LoadedModel>>,
}

impl CoquiTtsRepository {
    pub fn new(client: EngineClient) -> Self {
        Self {
            client,
            // Loaded models are never evicted
            models: Cache::builder().build(),
        }
    }

    /// Load `model` once; concurrent callers share a single load request
    async fn load_model(&self, model: &str) -> Result<Arc<LoadedModel>, EngineError> {
        self.models
            .try_get_with(model.to_string(), async {
                tracing::info!(model = model, "Loading Coqui model");
                let loaded: LoadedModel = self.client.post_json("/models/load", &json!({ "model": model })).await?;
                tracing::info!(
                    model = model,
                    speakers = loaded.speakers.len(),
                    languages = loaded.languages.len(),
                    "Coqui model loaded"
                );
                Ok::<_, EngineError>(Arc::new(loaded))
            })
            .await
            .map_err(|e| EngineError::ModelLoad {
                model: model.to_string(),
                message: e.to_string(),
            })
    }

    fn is_multilingual(model: &str) -> bool {
        let lower = model.to_lowercase();
        MULTILINGUAL_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

#[async_trait]
impl Synthesizer for CoquiTtsRepository {
    fn engine_name(&self) -> &'static str {
        "coqui"
    }

    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        let model = options
            .model
            .as_deref()
            .ok_or_else(|| EngineError::InvalidRequest("no model selected".to_string()))?;
        let loaded = self.load_model(model).await?;

        let mut form = Form::new()
            .text("model", model.to_string())
            .text("text", text.to_string());

        if let Some(speaker) = options.speaker.as_deref() {
            if loaded.speakers.iter().any(|s| s == speaker) {
                form = form.text("speaker", speaker.to_string());
            } else {
                tracing::warn!(model = model, speaker = speaker, "Speaker not offered by model, using default");
            }
        }

        if Self::is_multilingual(model) || loaded.languages.iter().any(|l| l == &options.language) {
            form = form.text("language", options.language.clone());
        } else if !loaded.languages.is_empty() {
            tracing::warn!(
                model = model,
                language = %options.language,
                "Language not offered by model, using default"
            );
        }

        if let Some(reference) = options.reference_audio.as_deref() {
            if reference.exists() {
                let bytes = tokio::fs::read(reference).await?;
                let part = Part::bytes(bytes).file_name("speaker.wav").mime_str("audio/wav")?;
                form = form.part("speaker_wav", part);
                tracing::info!(model = model, reference = %reference.display(), "Using speaker reference audio");
            }
        }

        tracing::info!(model = model, text_length = text.chars().count(), "Synthesizing with Coqui");
        let audio = self.client.post_form_for_audio("/synthesize", form).await?;
        persist_wav(&audio, output_path)
    }

    async fn is_loaded(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }
}

#[async_trait]
impl SpeakerAware for CoquiTtsRepository {
    async fn list_speakers(&self, model: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.load_model(model).await?.speakers.clone())
    }
}

#[async_trait]
impl LanguageAware for CoquiTtsRepository {
    async fn list_languages(&self, model: &str) -> Result<Vec<String>, EngineError> {
        let loaded = self.load_model(model).await?;
        if loaded.languages.is_empty() {
            return Ok(FALLBACK_LANGUAGES.iter().map(|l| l.to_string()).collect());
        }
        Ok(loaded.languages.clone())
    }
}

#[async_trait]
impl EngineHealth for CoquiTtsRepository {
    async fn probe(&self) -> Result<(), EngineError> {
        self.client.health().await
    }
}
