use super::error::TtsServiceError;
use super::language::{normalize_language, DEFAULT_LANGUAGE};
use super::model::{
    EngineKind, GeneratedAudio, ModelInfo, ModelSelection, SynthesisOptions, SynthesisRequest, BARK_MODEL_ID,
    OPENVOICE_MODEL_ID,
};
use crate::infrastructure::audio::adjust_speed_in_place;
use crate::infrastructure::repositories::{EngineHandle, EngineRegistry};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Dispatcher settings taken from configuration
#[derive(Debug, Clone)]
pub struct TtsSettings {
    pub default_model: String,
    pub generic_models: Vec<String>,
    pub max_text_chars: usize,
    pub synthesis_timeout: Duration,
}

/// Readiness of one engine kind
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineStatus {
    pub engine: &'static str,
    pub configured: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<&'static str>,
}

fn capabilities(handle: &EngineHandle) -> Vec<&'static str> {
    let mut capabilities = vec!["synthesize"];
    if handle.synthesizer.long_form_threshold().is_some() {
        capabilities.push("long_form");
    }
    if handle.speakers.is_some() {
        capabilities.push("speakers");
    }
    if handle.languages.is_some() {
        capabilities.push("languages");
    }
    if handle.embeddings.is_some() {
        capabilities.push("voice_cloning");
    }
    capabilities
}

pub struct TtsService {
    registry: Arc<EngineRegistry>,
    settings: TtsSettings,
}

impl TtsService {
    pub fn new(registry: Arc<EngineRegistry>, settings: TtsSettings) -> Self {
        Self { registry, settings }
    }

    fn resolve(&self, model: Option<&str>) -> ModelSelection {
        ModelSelection::resolve(model, &self.settings.generic_models, &self.settings.default_model)
    }

    fn validate(&self, request: &SynthesisRequest) -> Result<(), TtsServiceError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(TtsServiceError::Invalid("Text cannot be empty".to_string()));
        }
        if text.chars().count() > self.settings.max_text_chars {
            return Err(TtsServiceError::TextTooLong(format!(
                "Text must be {} characters or less",
                self.settings.max_text_chars
            )));
        }
        if !request.speed.is_finite() || request.speed <= 0.0 {
            return Err(TtsServiceError::Invalid("Speed must be a positive number".to_string()));
        }
        Ok(())
    }

    /// Translate request fields into what the selected engine understands
    fn engine_options(&self, selection: &ModelSelection, request: &SynthesisRequest, text: &str) -> SynthesisOptions {
        let mut options = SynthesisOptions {
            language: normalize_language(request.language.as_deref(), text),
            speed: request.speed,
            ..Default::default()
        };

        match selection {
            ModelSelection::Generic(model) => {
                options.model = Some(model.clone());
                options.speaker = request.speaker.as_ref().and_then(|s| s.label());
                options.reference_audio = request.reference_audio.clone();
            }
            ModelSelection::PresetVoice => {
                options.preset = request.speaker.as_ref().and_then(|s| s.preset_index());
                if options.preset.is_none() && request.speaker.is_some() {
                    tracing::debug!("Speaker is not a preset number, using default Bark voice");
                }
            }
            ModelSelection::Cloning => {
                if request.speaker.is_some() {
                    tracing::debug!("Speaker ignored, OpenVoice clones from reference audio");
                }
                options.reference_audio = request.reference_audio.clone();
            }
        }

        options
    }

    async fn run_engine(
        &self,
        handle: &EngineHandle,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
        long_form: bool,
    ) -> Result<(), TtsServiceError> {
        let synthesizer = &handle.synthesizer;
        let work = async {
            if long_form {
                synthesizer.synthesize_long_form(text, output_path, options).await
            } else {
                synthesizer.synthesize(text, output_path, options).await
            }
        };

        match tokio::time::timeout(self.settings.synthesis_timeout, work).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TtsServiceError::from_engine(handle.kind, e)),
            Err(_) => Err(TtsServiceError::Timeout {
                engine: handle.kind,
                seconds: self.settings.synthesis_timeout.as_secs(),
            }),
        }
    }

    /// Re-time the output unless the engine already did. Failure keeps the
    /// original file.
    async fn apply_speed(&self, handle: &EngineHandle, output_path: &Path, speed: f32) -> bool {
        if speed == 1.0 || handle.synthesizer.applies_speed() {
            return false;
        }

        let path = output_path.to_path_buf();
        match tokio::task::spawn_blocking(move || adjust_speed_in_place(&path, speed)).await {
            Ok(Ok(adjusted)) => adjusted,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, speed = speed, "Speed adjustment failed, keeping original audio");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, speed = speed, "Speed adjustment task failed, keeping original audio");
                false
            }
        }
    }
}

async fn remove_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed output after failed synthesis"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not remove failed output"),
    }
}

#[async_trait]
pub trait TtsServiceApi: Send + Sync {
    /// Synthesize `request.text` into `request.output_path`.
    ///
    /// On success the file is a complete WAV; on failure nothing is left at
    /// the output path.
    async fn dispatch(&self, request: SynthesisRequest) -> Result<GeneratedAudio, TtsServiceError>;

    /// Model identifiers clients may request, engine aliases first
    fn available_models(&self) -> Vec<String>;

    async fn speakers(&self, model: &str) -> Vec<String>;

    async fn languages(&self, model: &str) -> Vec<String>;

    async fn model_info(&self, model: &str) -> ModelInfo;

    async fn engine_status(&self) -> Vec<EngineStatus>;
}

#[async_trait]
impl TtsServiceApi for TtsService {
    async fn dispatch(&self, request: SynthesisRequest) -> Result<GeneratedAudio, TtsServiceError> {
        self.validate(&request)?;

        let started = Instant::now();
        let text = request.text.trim();
        let selection = self.resolve(request.model.as_deref());
        let kind = selection.kind();

        let handle = self.registry.get(kind).ok_or_else(|| {
            tracing::warn!(engine = kind.key(), model = selection.model_name(), "Engine not configured");
            TtsServiceError::Unavailable(kind)
        })?;

        let options = self.engine_options(&selection, &request, text);
        let text_length = text.chars().count();
        let long_form = handle
            .synthesizer
            .long_form_threshold()
            .map_or(false, |threshold| text_length > threshold);

        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TtsServiceError::Other(e.into()))?;
        }

        tracing::info!(
            engine = kind.key(),
            model = selection.model_name(),
            language = %options.language,
            text_length = text_length,
            long_form = long_form,
            speed = request.speed,
            "Dispatching synthesis"
        );

        if let Err(e) = self
            .run_engine(handle, text, &request.output_path, &options, long_form)
            .await
        {
            tracing::error!(
                engine = kind.key(),
                model = selection.model_name(),
                error = %e,
                "Synthesis failed"
            );
            remove_output(&request.output_path).await;
            return Err(e);
        }

        let speed_adjusted = self.apply_speed(handle, &request.output_path, request.speed).await;

        tracing::info!(
            engine = kind.key(),
            model = selection.model_name(),
            path = %request.output_path.display(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Synthesis completed"
        );

        Ok(GeneratedAudio {
            path: request.output_path,
            engine: kind,
            model: selection.model_name().to_string(),
            long_form,
            speed_adjusted,
        })
    }

    fn available_models(&self) -> Vec<String> {
        let mut models = Vec::new();

        if self.registry.is_available(EngineKind::PresetVoice) {
            models.push(BARK_MODEL_ID.to_string());
        }
        if self.registry.is_available(EngineKind::Cloning) {
            models.push(OPENVOICE_MODEL_ID.to_string());
        }
        if self.registry.is_available(EngineKind::Generic) {
            models.push(self.settings.default_model.clone());
            for model in &self.settings.generic_models {
                if !models.contains(model) {
                    models.push(model.clone());
                }
            }
        }

        models
    }

    async fn speakers(&self, model: &str) -> Vec<String> {
        let selection = self.resolve(Some(model));
        let Some(speakers) = self.registry.get(selection.kind()).and_then(|h| h.speakers.clone()) else {
            return Vec::new();
        };

        match speakers.list_speakers(selection.model_name()).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(model = selection.model_name(), error = %e, "Could not list speakers");
                Vec::new()
            }
        }
    }

    async fn languages(&self, model: &str) -> Vec<String> {
        let fallback = || vec![DEFAULT_LANGUAGE.to_string()];
        let selection = self.resolve(Some(model));
        let Some(languages) = self.registry.get(selection.kind()).and_then(|h| h.languages.clone()) else {
            return fallback();
        };

        match languages.list_languages(selection.model_name()).await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => fallback(),
            Err(e) => {
                tracing::warn!(model = selection.model_name(), error = %e, "Could not list languages");
                fallback()
            }
        }
    }

    async fn model_info(&self, model: &str) -> ModelInfo {
        let selection = self.resolve(Some(model));
        let loaded = match self.registry.get(selection.kind()) {
            Some(handle) => handle.synthesizer.is_loaded(selection.model_name()).await,
            None => false,
        };

        ModelInfo {
            name: selection.model_name().to_string(),
            speakers: self.speakers(model).await,
            languages: self.languages(model).await,
            loaded,
        }
    }

    async fn engine_status(&self) -> Vec<EngineStatus> {
        let mut statuses = Vec::with_capacity(EngineKind::ALL.len());

        for kind in EngineKind::ALL {
            let status = match self.registry.get(kind) {
                None => EngineStatus {
                    engine: kind.key(),
                    configured: false,
                    healthy: false,
                    capabilities: Vec::new(),
                },
                Some(handle) => {
                    let healthy = match &handle.health {
                        Some(health) => match health.probe().await {
                            Ok(()) => true,
                            Err(e) => {
                                tracing::warn!(engine = kind.key(), error = %e, "Engine health probe failed");
                                false
                            }
                        },
                        None => true,
                    };
                    EngineStatus {
                        engine: kind.key(),
                        configured: true,
                        healthy,
                        capabilities: capabilities(handle),
                    }
                }
            };
            statuses.push(status);
        }

        statuses
    }
}
