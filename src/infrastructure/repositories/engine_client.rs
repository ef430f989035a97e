use super::tts_repository::EngineError;
use reqwest::{multipart::Form, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Thin HTTP client for an engine sidecar
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EngineErrorBody {
    #[serde(alias = "detail", alias = "message")]
    error: String,
}

impl EngineClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, EngineError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let response = check_status(response).await?;
        let parsed = response.json::<R>().await?;
        tracing::debug!(path = path, latency_ms = started.elapsed().as_millis() as u64, "Engine call completed");
        Ok(parsed)
    }

    pub async fn post_json_for_audio<B>(&self, path: &str, body: &B) -> Result<Vec<u8>, EngineError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let started = Instant::now();
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        tracing::debug!(
            path = path,
            bytes = bytes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Engine audio received"
        );
        Ok(bytes.to_vec())
    }

    pub async fn post_form<R: DeserializeOwned>(&self, path: &str, form: Form) -> Result<R, EngineError> {
        let response = self.http.post(self.url(path)).multipart(form).send().await?;
        Ok(check_status(response).await?.json::<R>().await?)
    }

    pub async fn post_form_for_audio(&self, path: &str, form: Form) -> Result<Vec<u8>, EngineError> {
        let started = Instant::now();
        let response = self.http.post(self.url(path)).multipart(form).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        tracing::debug!(
            path = path,
            bytes = bytes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Engine audio received"
        );
        Ok(bytes.to_vec())
    }

    pub async fn health(&self) -> Result<(), EngineError> {
        let response = self.http.get(self.url("/health")).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`EngineError::Engine`], preferring the
/// engine's own `{error}` / `{detail}` message over the raw body
async fn check_status(response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<EngineErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                trimmed.chars().take(500).collect()
            }
        });

    Err(EngineError::Engine {
        status: status.as_u16(),
        message,
    })
}
