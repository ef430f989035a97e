use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::tts::TtsService;
use crate::infrastructure::config::Config;
use crate::{
    controllers::{audio::AudioController, health, models::ModelsController},
    infrastructure::middleware::request_id_middleware,
};

/// Build the application router
pub fn create_router(
    tts_service: Arc<TtsService>,
    audio_controller: Arc<AudioController>,
    models_controller: Arc<ModelsController>,
    max_upload_bytes: usize,
) -> Router {
    let audio_routes = Router::new()
        .route("/generate", post(AudioController::generate))
        .route("/download/:filename", get(AudioController::download))
        .with_state(audio_controller);

    let model_routes = Router::new()
        .route("/models", get(ModelsController::list_models))
        .route("/speakers/*model", get(ModelsController::speakers))
        .route("/languages/*model", get(ModelsController::languages))
        .route("/model-info/*model", get(ModelsController::model_info))
        .with_state(models_controller);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(tts_service)
        .merge(audio_routes)
        .merge(model_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(config: Arc<Config>, app: Router) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
