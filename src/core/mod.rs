//! # Core Module
//!
//! Value types shared by capture, the remote clients and the session.

pub mod image_set;
pub mod payload;

pub use image_set::{ImageRole, ImageSet, Persona};
pub use payload::{ImagePayload, JPEG_MIME};
