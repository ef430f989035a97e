use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use audiogen_backend::controllers::{audio::AudioController, models::ModelsController};
use audiogen_backend::domain::tts::{EngineKind, TtsService, TtsSettings};
use audiogen_backend::infrastructure::config::{Config, LogFormat};
use audiogen_backend::infrastructure::http::{create_router, start_http_server};
use audiogen_backend::infrastructure::repositories::{
    BarkSettings, BarkTtsRepository, CoquiTtsRepository, EngineClient, EngineHandle, EngineRegistry,
    OpenVoiceTtsRepository,
};
use audiogen_backend::infrastructure::storage::{spawn_retention_sweeper, AudioStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        environment = ?config.environment,
        "Starting Audiogen Backend on {}:{}",
        config.host,
        config.port
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate engine adapters for every configured engine
    tracing::info!("Instantiating engine adapters...");
    let mut registry = EngineRegistry::new();

    if let Some(url) = &config.coqui_engine_url {
        let coqui = Arc::new(CoquiTtsRepository::new(EngineClient::new(
            url.as_str(),
            config.engine_request_timeout(),
        )?));
        registry = registry.register(
            EngineHandle::new(EngineKind::Generic, coqui.clone())
                .with_speakers(coqui.clone())
                .with_languages(coqui.clone())
                .with_health(coqui),
        );
    }

    if let Some(url) = &config.bark_engine_url {
        let bark = Arc::new(BarkTtsRepository::new(
            EngineClient::new(url.as_str(), config.engine_request_timeout())?,
            BarkSettings {
                use_small_models: config.bark_use_small_models,
                offload_cpu: config.bark_offload_cpu,
            },
        ));
        registry = registry.register(
            EngineHandle::new(EngineKind::PresetVoice, bark.clone())
                .with_speakers(bark.clone())
                .with_languages(bark.clone())
                .with_health(bark),
        );
    }

    if let Some(url) = &config.openvoice_engine_url {
        let openvoice = Arc::new(OpenVoiceTtsRepository::new(EngineClient::new(
            url.as_str(),
            config.engine_request_timeout(),
        )?));
        registry = registry.register(
            EngineHandle::new(EngineKind::Cloning, openvoice.clone())
                .with_languages(openvoice.clone())
                .with_embeddings(openvoice.clone())
                .with_health(openvoice),
        );
    }

    for kind in EngineKind::ALL {
        if !registry.is_available(kind) {
            tracing::warn!(engine = kind.key(), "Engine not configured, requests for it will fail");
        }
    }

    // 2. Instantiate storage
    let storage = Arc::new(AudioStorage::new(&config.output_dir, &config.speaker_upload_dir)?);
    tracing::info!(
        output_dir = %config.output_dir.display(),
        upload_dir = %config.speaker_upload_dir.display(),
        "Audio storage ready"
    );

    match config.retention() {
        Some(max_age) => {
            spawn_retention_sweeper(storage.clone(), max_age, config.retention_sweep_interval());
            tracing::info!(retention_hours = config.retention_hours, "Retention sweep scheduled");
        }
        None => tracing::info!("Retention sweep disabled"),
    }

    // 3. Instantiate services
    tracing::info!("Instantiating services...");
    let tts_service = Arc::new(TtsService::new(
        Arc::new(registry),
        TtsSettings {
            default_model: config.default_model.clone(),
            generic_models: config.generic_models.clone(),
            max_text_chars: config.max_text_chars,
            synthesis_timeout: config.synthesis_timeout(),
        },
    ));

    // 4. Instantiate controllers
    tracing::info!("Instantiating controllers...");
    let audio_controller = Arc::new(AudioController::new(tts_service.clone(), storage));
    let models_controller = Arc::new(ModelsController::new(tts_service.clone()));

    // Start HTTP server with all routes
    let app = create_router(tts_service, audio_controller, models_controller, config.max_upload_bytes);
    start_http_server(config, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiogen_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiogen_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
