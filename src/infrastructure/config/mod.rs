use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "tts_models/en/ljspeech/tacotron2-DDC";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Storage
    pub output_dir: PathBuf,
    pub speaker_upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_text_chars: usize,
    // Models
    pub default_model: String,
    pub generic_models: Vec<String>,
    // Engines (absent URL = engine unavailable)
    pub coqui_engine_url: Option<String>,
    pub bark_engine_url: Option<String>,
    pub openvoice_engine_url: Option<String>,
    pub bark_use_small_models: bool,
    pub bark_offload_cpu: bool,
    pub engine_request_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
    // Retention
    pub retention_hours: u64,
    pub retention_sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            environment: match env::var("ENVIRONMENT").unwrap_or_default().as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT").unwrap_or_default().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "generated_audio".to_string())
                .into(),
            speaker_upload_dir: env::var("SPEAKER_UPLOAD_DIR")
                .unwrap_or_else(|_| "speaker_audio".to_string())
                .into(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (16 * 1024 * 1024).to_string())
                .parse()?,
            max_text_chars: env::var("MAX_TEXT_CHARS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()?,
            default_model: optional_var("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generic_models: optional_var("GENERIC_MODELS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            coqui_engine_url: optional_var("COQUI_ENGINE_URL"),
            bark_engine_url: optional_var("BARK_ENGINE_URL"),
            openvoice_engine_url: optional_var("OPENVOICE_ENGINE_URL"),
            bark_use_small_models: flag("BARK_USE_SMALL_MODELS"),
            bark_offload_cpu: flag("BARK_OFFLOAD_CPU"),
            engine_request_timeout_secs: env::var("ENGINE_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            synthesis_timeout_secs: env::var("SYNTHESIS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()?,
            retention_hours: env::var("RETENTION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            retention_sweep_interval_secs: env::var("RETENTION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn engine_request_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_request_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    /// `None` when retention is disabled
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_hours > 0).then(|| Duration::from_secs(self.retention_hours * 3600))
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs.max(1))
    }
}
