//! # Remote Model Clients
//!
//! The two prompt-engineered calls a try-on run is made of, on top of a
//! pluggable transport.
//!
//! ## Architecture
//!
//! 1. **GenerativeBackend Trait**: one `generateContent` round trip
//! 2. **GeminiBackend**: REST implementation over `reqwest`
//! 3. **AnalysisClient**: structured analysis (pose, sleeves, occlusion, styling)
//! 4. **SynthesisClient**: image generation from the analysis directive
//!
//! Clients hold the backend behind an `Arc<dyn GenerativeBackend>`, so tests
//! swap in a scripted backend without touching the network. Neither client
//! retries; every failure surfaces once as a stage error.

pub mod analysis;
pub mod gemini;
pub mod synthesis;
pub mod wire;

use async_trait::async_trait;
use thiserror::Error;

pub use analysis::{AnalysisClient, AnalysisResult, BodySize, StylingSuggestions};
pub use gemini::GeminiBackend;
pub use synthesis::SynthesisClient;
pub use wire::{GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part};

/// Transport-level failure of a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request failed ({code}): {body}")]
    Status { code: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl BackendError {
    /// HTTP status of a rejected request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Abstract `generateContent` transport.
/// Implement this trait to route model calls somewhere other than the REST API.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Send one request to `model` and return the decoded response.
    ///
    /// # Arguments
    /// * `model` - Model identifier, e.g. `gemini-2.5-flash-image`
    /// * `request` - Request body
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError>;
}
