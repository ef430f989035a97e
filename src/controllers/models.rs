use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::domain::tts::{
    dto::{LanguagesResponse, ModelsResponse, SpeakersResponse},
    ModelInfo, TtsService, TtsServiceApi,
};

pub struct ModelsController {
    tts_service: Arc<TtsService>,
}

impl ModelsController {
    pub fn new(tts_service: Arc<TtsService>) -> Self {
        Self { tts_service }
    }

    /// GET /models
    pub async fn list_models(State(controller): State<Arc<ModelsController>>) -> Json<ModelsResponse> {
        Json(ModelsResponse {
            models: controller.tts_service.available_models(),
        })
    }

    /// GET /speakers/*model
    pub async fn speakers(
        State(controller): State<Arc<ModelsController>>,
        Path(model): Path<String>,
    ) -> Json<SpeakersResponse> {
        Json(SpeakersResponse {
            speakers: controller.tts_service.speakers(&model).await,
        })
    }

    /// GET /languages/*model
    pub async fn languages(
        State(controller): State<Arc<ModelsController>>,
        Path(model): Path<String>,
    ) -> Json<LanguagesResponse> {
        Json(LanguagesResponse {
            languages: controller.tts_service.languages(&model).await,
        })
    }

    /// GET /model-info/*model
    pub async fn model_info(
        State(controller): State<Arc<ModelsController>>,
        Path(model): Path<String>,
    ) -> Json<ModelInfo> {
        Json(controller.tts_service.model_info(&model).await)
    }
}
