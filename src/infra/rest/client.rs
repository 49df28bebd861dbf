use crate::error::AppError;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Uniform response wrapper used by the booking API.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvelopeError {
    Message(String),
    Detailed {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl EnvelopeError {
    fn is_conflict(&self) -> bool {
        match self {
            EnvelopeError::Message(msg) => msg.to_lowercase().contains("conflict"),
            EnvelopeError::Detailed { code, .. } => code
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case("conflict") || c == "409")
                .unwrap_or(false),
        }
    }

    fn message(&self) -> String {
        match self {
            EnvelopeError::Message(msg) => msg.clone(),
            EnvelopeError::Detailed { code, message } => message
                .clone()
                .or_else(|| code.clone())
                .unwrap_or_else(|| "Request rejected".to_string()),
        }
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| e.message())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Thin JSON client for the booking API with bearer auth and bounded retries.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        if self.token.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {}", self.token))
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, AppError> {
        let data = self.send(Method::GET, path, query, None).await?;
        decode(data)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, AppError> {
        let payload = serde_json::to_value(body).map_err(|e| AppError::InternalWithMsg(e.to_string()))?;
        let data = self.send(Method::POST, path, &[], Some(&payload)).await?;
        decode(data)
    }

    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<(), AppError> {
        let payload = serde_json::to_value(body).map_err(|e| AppError::InternalWithMsg(e.to_string()))?;
        self.send(Method::PATCH, path, &[], Some(&payload)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.send(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    /// Sends one request and unwraps the envelope. Network failures, 5xx and 429
    /// are retried with exponential backoff, except for POST which is not idempotent.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let retryable = method != Method::POST;
        let mut retries = 0;
        let mut backoff = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self.request(method.clone(), path).query(query);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        return unwrap_envelope(&text);
                    }

                    let text = response.text().await.unwrap_or_default();
                    let transient = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if !transient || !retryable || retries >= MAX_RETRIES {
                        error!("{} {} failed with status {}: {}", method, path, status, text);
                        return Err(map_status(status, &text));
                    }
                    warn!("{} {} transient error {}. Retrying in {}ms...", method, path, status, backoff);
                }
                Err(e) => {
                    if !retryable || retries >= MAX_RETRIES {
                        error!("{} {} network error after {} retries: {:?}", method, path, retries, e);
                        return Err(e.into());
                    }
                    warn!("{} {} network error. Retrying in {}ms... {:?}", method, path, backoff, e);
                }
            }

            sleep(Duration::from_millis(backoff)).await;
            retries += 1;
            backoff *= 2;
        }
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|e| {
        error!("Unexpected payload shape: {}", e);
        AppError::Transport(format!("Malformed response payload: {}", e))
    })
}

fn unwrap_envelope(text: &str) -> Result<Value, AppError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| AppError::Transport(format!("Malformed response envelope: {}", e)))?;

    if envelope.success {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }

    match envelope.error {
        Some(err) if err.is_conflict() => Err(AppError::Conflict(err.message())),
        Some(err) => {
            debug!("Request rejected by upstream: {}", err.message());
            Err(AppError::Validation(err.message()))
        }
        None => Err(AppError::Transport("Request failed without error detail".to_string())),
    }
}

fn map_status(status: StatusCode, body: &str) -> AppError {
    let message = error_message(body);
    match status {
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Transport(format!("Authentication rejected ({})", status.as_u16()))
        }
        _ => AppError::Transport(format!("{} - {}", status, message)),
    }
}
