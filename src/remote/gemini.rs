//! REST transport for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::wire::{GenerateContentRequest, GenerateContentResponse};
use super::{BackendError, GenerativeBackend};
use crate::config::TryOnConfig;
use crate::error::{TryOnError, TryOnResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const ERROR_BODY_LIMIT: usize = 512;

/// `GenerativeBackend` that posts JSON to `{api_base}/models/{model}:generateContent`.
#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> TryOnResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TryOnError::configuration("http client", e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &TryOnConfig) -> TryOnResult<Self> {
        Self::new(config.api_base.clone(), config.api_key.clone())
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError> {
        let url = self.endpoint(model);
        debug!(model, parts = request.parts().count(), "posting generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("response body read failed: {e}")))?;

        if !status.is_success() {
            return Err(BackendError::Status {
                code: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
