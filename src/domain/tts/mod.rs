pub mod chunker;
pub mod dto;
pub mod error;
pub mod language;
pub mod model;
pub mod service;

pub use chunker::chunk;
pub use error::TtsServiceError;
pub use language::{detect_language, normalize_language, LanguageCode};
pub use model::{
    EngineKind, GeneratedAudio, ModelInfo, ModelSelection, SpeakerInput, SynthesisOptions, SynthesisRequest,
    VoiceEmbedding, BARK_MODEL_ID, OPENVOICE_MODEL_ID,
};
pub use service::{EngineStatus, TtsService, TtsServiceApi, TtsSettings};
