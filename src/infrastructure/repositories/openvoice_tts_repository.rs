use super::engine_client::EngineClient;
use super::tts_repository::{
    concat_wavs, persist_wav, EmbeddingExtractor, EngineError, EngineHealth, LanguageAware, Synthesizer,
};
use crate::domain::tts::{chunk, SynthesisOptions, VoiceEmbedding, OPENVOICE_MODEL_ID};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::OnceCell;

pub const OPENVOICE_CHUNK_CHARS: usize = 1000;

/// Watermark message embedded by the tone color converter
const WATERMARK: &str = "@MyShell";

/// Base speaker style used before tone conversion
const BASE_SPEAKER: &str = "default";

/// Language codes accepted by the base speaker and the label it expects
const LANGUAGE_LABELS: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("kr", "Korean"),
];

pub fn language_label(code: &str) -> &'static str {
    match LANGUAGE_LABELS.iter().find(|(c, _)| *c == code) {
        Some((_, label)) => *label,
        None => {
            tracing::warn!(language = code, "Language not supported by OpenVoice, using English");
            "English"
        }
    }
}

#[derive(Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    speaker: &'a str,
    language: &'a str,
    speed: f32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: VoiceEmbedding,
}

/// Adapter for an OpenVoice server: base speaker TTS followed by tone color
/// conversion towards the reference voice
pub struct OpenVoiceTtsRepository {
    client: EngineClient,
    loaded: OnceCell<()>,
}

impl OpenVoiceTtsRepository {
    pub fn new(client: EngineClient) -> Self {
        Self {
            client,
            loaded: OnceCell::new(),
        }
    }

    async fn ensure_loaded(&self) -> Result<(), EngineError> {
        self.loaded
            .get_or_try_init(|| async {
                tracing::info!("Loading OpenVoice models");
                self.client
                    .post_json::<_, serde_json::Value>("/load", &serde_json::json!({}))
                    .await
                    .map_err(|e| EngineError::ModelLoad {
                        model: OPENVOICE_MODEL_ID.to_string(),
                        message: e.to_string(),
                    })?;
                tracing::info!("OpenVoice models loaded");
                Ok::<(), EngineError>(())
            })
            .await
            .map(|_| ())
    }

    /// Embedding for the reference voice, if one was supplied and exists
    async fn target_voice(&self, options: &SynthesisOptions) -> Result<Option<VoiceEmbedding>, EngineError> {
        match options.reference_audio.as_deref() {
            Some(path) if path.exists() => Ok(Some(self.extract_embedding(path).await?)),
            Some(path) => {
                tracing::warn!(reference = %path.display(), "Reference audio not found, using default voice");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn base_tts(&self, text: &str, language: &str, speed: f32) -> Result<Vec<u8>, EngineError> {
        let body = TtsBody {
            text,
            speaker: BASE_SPEAKER,
            language,
            speed,
        };
        self.client.post_json_for_audio("/tts", &body).await
    }

    async fn convert(&self, base_audio: Vec<u8>, target: &VoiceEmbedding) -> Result<Vec<u8>, EngineError> {
        let target_se = serde_json::to_string(target)
            .map_err(|e| EngineError::InvalidRequest(format!("invalid embedding: {}", e)))?;
        let form = Form::new()
            .part("audio", Part::bytes(base_audio).file_name("base.wav").mime_str("audio/wav")?)
            .text("target_se", target_se)
            .text("message", WATERMARK);
        self.client.post_form_for_audio("/convert", form).await
    }

    /// Base TTS for one piece of text, converted when a target voice is set
    async fn render(
        &self,
        text: &str,
        language: &str,
        speed: f32,
        target: Option<&VoiceEmbedding>,
    ) -> Result<Vec<u8>, EngineError> {
        let base = self.base_tts(text, language, speed).await?;
        match target {
            Some(embedding) => self.convert(base, embedding).await,
            None => Ok(base),
        }
    }
}

#[async_trait]
impl Synthesizer for OpenVoiceTtsRepository {
    fn engine_name(&self) -> &'static str {
        "openvoice"
    }

    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.ensure_loaded().await?;

        let language = language_label(&options.language);
        let target = self.target_voice(options).await?;
        tracing::info!(
            language = language,
            cloning = target.is_some(),
            speed = options.speed,
            text_length = text.chars().count(),
            "Generating with OpenVoice"
        );

        let audio = self.render(text, language, options.speed, target.as_ref()).await?;
        persist_wav(&audio, output_path)
    }

    fn long_form_threshold(&self) -> Option<usize> {
        Some(OPENVOICE_CHUNK_CHARS)
    }

    async fn synthesize_long_form(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.ensure_loaded().await?;

        let language = language_label(&options.language);
        // Extracted once and reused for every chunk
        let target = self.target_voice(options).await?;
        let chunks = chunk(text, OPENVOICE_CHUNK_CHARS);
        tracing::info!(
            language = language,
            cloning = target.is_some(),
            chunks = chunks.len(),
            "Generating long-form audio with OpenVoice"
        );

        let mut parts = Vec::with_capacity(chunks.len());
        for (chunk_index, piece) in chunks.iter().enumerate() {
            tracing::debug!(chunk_index = chunk_index, chunk_length = piece.chars().count(), "Generating OpenVoice chunk");
            parts.push(self.render(piece, language, options.speed, target.as_ref()).await?);
        }

        if parts.is_empty() {
            return Err(EngineError::InvalidRequest("no text to synthesize".to_string()));
        }

        persist_wav(&concat_wavs(parts)?, output_path)
    }

    fn applies_speed(&self) -> bool {
        true
    }

    async fn is_loaded(&self, _model: &str) -> bool {
        self.loaded.initialized()
    }
}

#[async_trait]
impl EmbeddingExtractor for OpenVoiceTtsRepository {
    async fn extract_embedding(&self, reference_audio: &Path) -> Result<VoiceEmbedding, EngineError> {
        let bytes = tokio::fs::read(reference_audio).await?;
        let file_name = reference_audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference.wav".to_string());
        let form = Form::new().part("audio", Part::bytes(bytes).file_name(file_name).mime_str("audio/wav")?);

        let response: EmbeddingResponse = self.client.post_form("/extract_embedding", form).await?;
        if response.embedding.is_empty() {
            return Err(EngineError::InvalidRequest("engine returned an empty voice embedding".to_string()));
        }

        tracing::info!(
            reference = %reference_audio.display(),
            dimensions = response.embedding.len(),
            "Voice embedding extracted"
        );
        Ok(response.embedding)
    }
}

#[async_trait]
impl LanguageAware for OpenVoiceTtsRepository {
    async fn list_languages(&self, _model: &str) -> Result<Vec<String>, EngineError> {
        Ok(LANGUAGE_LABELS.iter().map(|(code, _)| code.to_string()).collect())
    }
}

#[async_trait]
impl EngineHealth for OpenVoiceTtsRepository {
    async fn probe(&self) -> Result<(), EngineError> {
        self.client.health().await
    }
}
