pub mod bark_tts_repository;
pub mod coqui_tts_repository;
pub mod engine_client;
pub mod openvoice_tts_repository;
pub mod tts_repository;

pub use bark_tts_repository::{BarkSettings, BarkTtsRepository};
pub use coqui_tts_repository::CoquiTtsRepository;
pub use engine_client::EngineClient;
pub use openvoice_tts_repository::OpenVoiceTtsRepository;
pub use tts_repository::{
    EmbeddingExtractor, EngineError, EngineHandle, EngineHealth, EngineRegistry, LanguageAware, SpeakerAware,
    Synthesizer,
};
