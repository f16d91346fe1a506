//! # Neural Try-On Studio
//!
//! Virtual garment try-on driven by a multimodal generative model. A person
//! photo and one or more garment references are analyzed for pose, sleeve
//! length, occlusions and styling, then handed to an image model that
//! renders the person wearing the garments.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `core`: Image payloads, roles, personas and the image set of a run
//! - `capture`: Upload normalization and live camera capture
//! - `remote`: The analysis and synthesis clients over a pluggable backend
//! - `studio`: The controller that owns state and drives a run
//! - `config`: Environment configuration and validation
//! - `error`: Error types with context and severity
//!
//! ## Example
//!
//! ```rust,no_run
//! use neural_tryon::{ImageRole, Studio, TryOnConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let studio = Studio::builder()
//!     .with_config(TryOnConfig::from_env()?)
//!     .build()?;
//!
//! studio.load_image_path(ImageRole::Person, "me.jpg").await?;
//! studio.load_image_path(ImageRole::Top, "tee.png").await?;
//!
//! let state = studio.run().await?;
//! if state.result_image.is_some() {
//!     studio.save_result(".").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod remote;
pub mod studio;

/// Re-export error types for convenience
pub use error::{HasRecoverySuggestion, HasSeverity, TryOnError, TryOnResult};

pub use crate::config::TryOnConfig;
pub use crate::core::{ImagePayload, ImageRole, ImageSet, Persona};
pub use remote::{AnalysisResult, BodySize, GenerativeBackend, StylingSuggestions};
pub use studio::{ActiveView, RESULT_FILENAME, Studio, StudioBuilder, WorkflowState, WorkflowStatus};

/// Re-export the upload presets from the scaling crate
pub use tryon_scale::presets::UploadPreset;
