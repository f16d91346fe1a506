//! # Configuration Module
//!
//! Runtime configuration for the try-on workflow. It is the common interface
//! between the CLI and the library: the CLI builds a [`TryOnConfig`] from the
//! environment, applies its flag overrides, validates, and hands it to the
//! session builder.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Environment | Default | Description |
//! |-----------|-------------|---------|-------------|
//! | `api_key` | `API_KEY` / `GEMINI_API_KEY` | none (required) | Credential for the remote model |
//! | `api_base` | `TRYON_API_BASE` | `https://generativelanguage.googleapis.com/v1beta` | REST base URL |
//! | `analysis_model` | `TRYON_ANALYSIS_MODEL` | `gemini-3-flash-preview` | Structured-output model |
//! | `synthesis_model` | `TRYON_SYNTHESIS_MODEL` | `gemini-2.5-flash-image` | Image generation model |
//! | `upload_preset` | `TRYON_UPLOAD_PRESET` | `balanced` | Upload downscale preset |
//!
//! A missing credential fails fast with a configuration error; nothing is
//! sent to the remote service without one.
//!
//! ## Examples
//!
//! ```rust
//! use neural_tryon::config::TryOnConfig;
//!
//! let config = TryOnConfig::from_lookup(|key| match key {
//!     "API_KEY" => Some("test-key".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(config.analysis_model, "gemini-3-flash-preview");
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;

use clap::ValueEnum;
use tryon_scale::presets::UploadPreset;

use crate::error::{TryOnError, TryOnResult};

/// Default REST base for the Gemini API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model for the structured analysis stage.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
/// Default model for the image synthesis stage.
pub const DEFAULT_SYNTHESIS_MODEL: &str = "gemini-2.5-flash-image";

/// Environment variables consulted for the credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Configuration for a try-on session.
///
/// `Debug` redacts the credential.
#[derive(Clone, PartialEq, Eq)]
pub struct TryOnConfig {
    /// Credential sent as `x-goog-api-key`.
    pub api_key: String,

    /// REST base URL without a trailing slash.
    pub api_base: String,

    /// Model used for the structured analysis request.
    pub analysis_model: String,

    /// Model used for the image synthesis request.
    pub synthesis_model: String,

    /// Downscale preset applied to uploads before they are stored.
    pub upload_preset: UploadPreset,
}

impl TryOnConfig {
    /// Creates a configuration with the default endpoint, models and preset.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            upload_preset: UploadPreset::default(),
        }
    }

    /// Build from the process environment, loading `.env` first if present.
    pub fn from_env() -> TryOnResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Empty and whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> TryOnResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| get(*key))
            .ok_or_else(|| {
                TryOnError::configuration("API_KEY", "environment variable is not set")
                    .with_recovery_suggestion(
                        "export API_KEY=<key> (or GEMINI_API_KEY) or add it to a .env file",
                    )
            })?;

        let mut config = Self::new(api_key);
        if let Some(base) = get("TRYON_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("TRYON_ANALYSIS_MODEL") {
            config.analysis_model = model;
        }
        if let Some(model) = get("TRYON_SYNTHESIS_MODEL") {
            config.synthesis_model = model;
        }
        if let Some(preset) = get("TRYON_UPLOAD_PRESET") {
            config.upload_preset = UploadPreset::from_str(&preset, true).map_err(|_| {
                TryOnError::configuration(
                    "TRYON_UPLOAD_PRESET",
                    format!("unknown preset '{preset}' (expected balanced, compact or original)"),
                )
            })?;
        }
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> TryOnResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(TryOnError::configuration("api_key", "must not be empty"));
        }
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(TryOnError::configuration(
                "api_base",
                format!("'{}' is not an http(s) URL", self.api_base),
            ));
        }
        if self.analysis_model.trim().is_empty() {
            return Err(TryOnError::configuration("analysis_model", "must not be empty"));
        }
        if self.synthesis_model.trim().is_empty() {
            return Err(TryOnError::configuration("synthesis_model", "must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for TryOnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryOnConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("analysis_model", &self.analysis_model)
            .field("synthesis_model", &self.synthesis_model)
            .field("upload_preset", &self.upload_preset)
            .finish()
    }
}
