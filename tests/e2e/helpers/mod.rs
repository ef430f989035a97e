use audiogen_backend::controllers::{audio::AudioController, models::ModelsController};
use audiogen_backend::domain::tts::{EngineKind, TtsService, TtsSettings};
use audiogen_backend::infrastructure::http::create_router;
use audiogen_backend::infrastructure::repositories::{EngineHandle, EngineRegistry};
use audiogen_backend::infrastructure::storage::AudioStorage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;

pub mod fake_engines;

use api_client::TestClient;
use fake_engines::FakeEngine;

pub const DEFAULT_MODEL: &str = "tts_models/en/ljspeech/tacotron2-DDC";
pub const XTTS_MODEL: &str = "tts_models/multilingual/multi-dataset/xtts_v2";
pub const MAX_TEXT_CHARS: usize = 2_000;

pub struct TestContext {
    pub client: TestClient,
    /// Generic engine fake
    pub coqui: Arc<FakeEngine>,
    /// Preset-voice engine fake. No cloning engine is registered.
    pub bark: Arc<FakeEngine>,
    pub output_dir: PathBuf,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

impl TestContext {
    /// Files currently in the output directory
    pub fn output_files(&self) -> Vec<String> {
        list_dir(&self.output_dir)
    }

    pub fn upload_files(&self) -> Vec<String> {
        list_dir(&self.upload_dir)
    }
}

fn list_dir(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let output_dir = dir.path().join("generated_audio");
            let upload_dir = dir.path().join("speaker_audio");

            let coqui = Arc::new(FakeEngine::new(
                "coqui",
                &["p225", "p226"],
                &["en", "es"],
                None,
            ));
            let bark = Arc::new(FakeEngine::new(
                "bark",
                &["Speaker 0", "Speaker 1", "Speaker 2", "Speaker 3"],
                &["en", "de", "es"],
                Some(250),
            ));

            let registry = EngineRegistry::new()
                .register(
                    EngineHandle::new(EngineKind::Generic, coqui.clone())
                        .with_speakers(coqui.clone())
                        .with_languages(coqui.clone())
                        .with_health(coqui.clone()),
                )
                .register(
                    EngineHandle::new(EngineKind::PresetVoice, bark.clone())
                        .with_speakers(bark.clone())
                        .with_languages(bark.clone())
                        .with_health(bark.clone()),
                );

            let tts_service = Arc::new(TtsService::new(
                Arc::new(registry),
                TtsSettings {
                    default_model: DEFAULT_MODEL.to_string(),
                    generic_models: vec![DEFAULT_MODEL.to_string(), XTTS_MODEL.to_string()],
                    max_text_chars: MAX_TEXT_CHARS,
                    synthesis_timeout: Duration::from_secs(30),
                },
            ));
            let storage = Arc::new(
                AudioStorage::new(&output_dir, &upload_dir).expect("Failed to create storage"),
            );

            let audio_controller = Arc::new(AudioController::new(tts_service.clone(), storage));
            let models_controller = Arc::new(ModelsController::new(tts_service.clone()));
            let app = create_router(tts_service, audio_controller, models_controller, 1024 * 1024);

            // Start server
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Wait for server to be ready
            tokio::time::sleep(Duration::from_millis(50)).await;

            Self {
                client: TestClient::new(&base_url),
                coqui,
                bark,
                output_dir,
                upload_dir,
                _dir: dir,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Temp directories are removed when `_dir` drops
        }
    }
}
