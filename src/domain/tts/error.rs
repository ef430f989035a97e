use super::model::EngineKind;
use crate::error::AppError;
use crate::infrastructure::repositories::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum TtsServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    TextTooLong(String),
    #[error("{0} is not available")]
    Unavailable(EngineKind),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("{engine} generation error: {message}")]
    Generation { engine: EngineKind, message: String },
    #[error("{engine} generation timed out after {seconds} seconds")]
    Timeout { engine: EngineKind, seconds: u64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TtsServiceError {
    /// Wrap an adapter failure for the engine that produced it
    pub fn from_engine(engine: EngineKind, err: EngineError) -> Self {
        match err {
            EngineError::ModelLoad { model, .. } => TtsServiceError::ModelLoad(model),
            other => TtsServiceError::Generation {
                engine,
                message: other.to_string(),
            },
        }
    }
}

impl From<TtsServiceError> for AppError {
    fn from(err: TtsServiceError) -> Self {
        match err {
            TtsServiceError::Invalid(msg) => AppError::BadRequest(msg),
            TtsServiceError::TextTooLong(msg) => AppError::PayloadTooLarge(msg),
            TtsServiceError::Other(e) => AppError::Internal(format!("An unexpected error occurred: {}", e)),
            other => AppError::Generation(other.to_string()),
        }
    }
}
