use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::{
    domain::tts::{
        dto::{GenerateRequest, GenerateResponse},
        SpeakerInput, SynthesisRequest, TtsService, TtsServiceApi,
    },
    error::{AppError, AppResult},
    infrastructure::storage::AudioStorage,
};

/// Fields of a generate request, from either a multipart form or JSON
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub text: Option<String>,
    pub model: Option<String>,
    pub speaker: Option<SpeakerInput>,
    pub language: Option<String>,
    pub speed: Option<f32>,
    pub speaker_audio: Option<Bytes>,
}

impl From<GenerateRequest> for GenerateForm {
    fn from(body: GenerateRequest) -> Self {
        Self {
            text: body.text,
            model: body.model,
            speaker: body.speaker,
            language: body.language,
            speed: body.speed,
            speaker_audio: None,
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::BadRequest(format!("Invalid form data: {}", err.body_text()))
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl GenerateForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = GenerateForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "speaker_audio" {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.speaker_audio = (!bytes.is_empty()).then_some(bytes);
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            match name.as_str() {
                "text" => form.text = Some(value),
                "model" => form.model = non_blank(value),
                "speaker" => form.speaker = non_blank(value).map(SpeakerInput::Label),
                "language" => form.language = non_blank(value),
                "speed" => {
                    if let Some(raw) = non_blank(value) {
                        let speed = raw
                            .parse::<f32>()
                            .map_err(|_| AppError::BadRequest(format!("Invalid speed value: {}", raw)))?;
                        form.speed = Some(speed);
                    }
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

#[async_trait]
impl<S> FromRequest<S> for GenerateForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let Json(body) = Json::<GenerateRequest>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
        Ok(body.into())
    }
}

pub struct AudioController {
    tts_service: Arc<TtsService>,
    storage: Arc<AudioStorage>,
}

impl AudioController {
    pub fn new(tts_service: Arc<TtsService>, storage: Arc<AudioStorage>) -> Self {
        Self { tts_service, storage }
    }

    /// POST /generate - Synthesize text into a downloadable WAV
    pub async fn generate(
        State(controller): State<Arc<AudioController>>,
        form: GenerateForm,
    ) -> AppResult<Json<GenerateResponse>> {
        let text = form.text.unwrap_or_default().trim().to_string();

        // Removed from disk when this handler returns
        let upload = match form.speaker_audio {
            Some(bytes) => Some(controller.storage.save_upload(&bytes).await?),
            None => None,
        };

        let (filename, output_path) = controller.storage.new_output();
        let request = SynthesisRequest {
            text: text.clone(),
            model: form.model,
            speaker: form.speaker.and_then(SpeakerInput::non_empty),
            language: form.language,
            speed: form.speed.unwrap_or(1.0),
            reference_audio: upload.as_ref().map(|u| u.path().to_path_buf()),
            output_path,
        };

        let generated = controller.tts_service.dispatch(request).await?;

        tracing::info!(
            filename = %filename,
            engine = generated.engine.key(),
            long_form = generated.long_form,
            speed_adjusted = generated.speed_adjusted,
            "Audio generated"
        );

        Ok(Json(GenerateResponse {
            success: true,
            audio_url: format!("/download/{}", filename),
            filename,
            text,
            model: generated.model,
        }))
    }

    /// GET /download/:filename - Serve a generated file as an attachment
    pub async fn download(
        State(controller): State<Arc<AudioController>>,
        Path(filename): Path<String>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let path = controller
            .storage
            .resolve_download(&filename)
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .map_err(|_| AppError::NotFound("File not found".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
        headers.insert(header::CONTENT_DISPOSITION, disposition);

        Ok((StatusCode::OK, headers, Body::from(bytes)))
    }
}
