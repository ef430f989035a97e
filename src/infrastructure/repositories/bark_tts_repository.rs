use super::engine_client::EngineClient;
use super::tts_repository::{
    concat_wavs, persist_wav, EngineError, EngineHealth, LanguageAware, SpeakerAware, Synthesizer,
};
use crate::domain::tts::{chunk, SynthesisOptions, BARK_MODEL_ID};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tokio::sync::OnceCell;

/// Bark degrades past roughly 13 seconds of speech per generation
pub const BARK_CHUNK_CHARS: usize = 250;

pub const BARK_LANGUAGES: &[&str] = &[
    "en", "de", "es", "fr", "hi", "it", "ja", "ko", "pl", "pt", "ru", "tr", "zh",
];

pub const DEFAULT_PRESET: u32 = 6;
pub const PRESETS_PER_LANGUAGE: u32 = 10;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?;:])").expect("punctuation pattern is valid"));
static LONG_ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").expect("ellipsis pattern is valid"));

/// Tidy text before it reaches Bark. Expressive cues such as `[laughs]`,
/// `♪` or CAPS pass through unchanged.
pub fn preprocess_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = LONG_ELLIPSIS.replace_all(&text, "...");
    text.trim().to_string()
}

/// Build the `v2/{lang}_speaker_{n}` history prompt.
///
/// Unsupported languages fall back to English and out-of-range presets to
/// the default speaker.
pub fn voice_preset(language: &str, preset: Option<u32>) -> String {
    let language = if BARK_LANGUAGES.contains(&language) {
        language
    } else {
        tracing::warn!(language = language, "Language not supported by Bark, using en");
        "en"
    };

    let speaker = match preset {
        Some(n) if n < PRESETS_PER_LANGUAGE => n,
        Some(n) => {
            tracing::warn!(preset = n, "Bark preset out of range, using default speaker");
            DEFAULT_PRESET
        }
        None => DEFAULT_PRESET,
    };

    format!("v2/{}_speaker_{}", language, speaker)
}

/// Model loading flags forwarded to the engine
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BarkSettings {
    pub use_small_models: bool,
    pub offload_cpu: bool,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    text: &'a str,
    history_prompt: &'a str,
}

/// Adapter for a Bark generation server
pub struct BarkTtsRepository {
    client: EngineClient,
    settings: BarkSettings,
    loaded: OnceCell<()>,
}

impl BarkTtsRepository {
    pub fn new(client: EngineClient, settings: BarkSettings) -> Self {
        Self {
            client,
            settings,
            loaded: OnceCell::new(),
        }
    }

    async fn ensure_loaded(&self) -> Result<(), EngineError> {
        self.loaded
            .get_or_try_init(|| async {
                tracing::info!(
                    use_small_models = self.settings.use_small_models,
                    offload_cpu = self.settings.offload_cpu,
                    "Loading Bark models"
                );
                self.client
                    .post_json::<_, serde_json::Value>("/load", &self.settings)
                    .await
                    .map_err(|e| EngineError::ModelLoad {
                        model: BARK_MODEL_ID.to_string(),
                        message: e.to_string(),
                    })?;
                tracing::info!("Bark models loaded");
                Ok::<(), EngineError>(())
            })
            .await
            .map(|_| ())
    }

    async fn generate(&self, text: &str, history_prompt: &str) -> Result<Vec<u8>, EngineError> {
        self.client
            .post_json_for_audio("/generate", &GenerateBody { text, history_prompt })
            .await
    }
}

#[async_trait]
impl Synthesizer for BarkTtsRepository {
    fn engine_name(&self) -> &'static str {
        "bark"
    }

    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.ensure_loaded().await?;

        let processed = preprocess_text(text);
        let prompt = voice_preset(&options.language, options.preset);
        tracing::info!(
            voice = %prompt,
            text_length = processed.chars().count(),
            "Generating with Bark"
        );
        if processed.chars().count() > BARK_CHUNK_CHARS {
            tracing::warn!(
                text_length = processed.chars().count(),
                "Text exceeds what Bark renders well in one generation"
            );
        }

        let audio = self.generate(&processed, &prompt).await?;
        persist_wav(&audio, output_path)
    }

    fn long_form_threshold(&self) -> Option<usize> {
        Some(BARK_CHUNK_CHARS)
    }

    async fn synthesize_long_form(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.ensure_loaded().await?;

        let processed = preprocess_text(text);
        let prompt = voice_preset(&options.language, options.preset);
        let chunks = chunk(&processed, BARK_CHUNK_CHARS);
        tracing::info!(voice = %prompt, chunks = chunks.len(), "Generating long-form audio with Bark");

        let mut parts = Vec::with_capacity(chunks.len());
        for (chunk_index, piece) in chunks.iter().enumerate() {
            tracing::debug!(chunk_index = chunk_index, chunk_length = piece.chars().count(), "Generating Bark chunk");
            parts.push(self.generate(piece, &prompt).await?);
        }

        if parts.is_empty() {
            return Err(EngineError::InvalidRequest("no text to synthesize".to_string()));
        }

        persist_wav(&concat_wavs(parts)?, output_path)
    }

    async fn is_loaded(&self, _model: &str) -> bool {
        self.loaded.initialized()
    }
}

#[async_trait]
impl SpeakerAware for BarkTtsRepository {
    async fn list_speakers(&self, _model: &str) -> Result<Vec<String>, EngineError> {
        Ok((0..PRESETS_PER_LANGUAGE).map(|n| format!("Speaker {}", n)).collect())
    }
}

#[async_trait]
impl LanguageAware for BarkTtsRepository {
    async fn list_languages(&self, _model: &str) -> Result<Vec<String>, EngineError> {
        Ok(BARK_LANGUAGES.iter().map(|l| l.to_string()).collect())
    }
}

#[async_trait]
impl EngineHealth for BarkTtsRepository {
    async fn probe(&self) -> Result<(), EngineError> {
        self.client.health().await
    }
}
