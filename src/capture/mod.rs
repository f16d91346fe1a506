//! # Capture Module
//!
//! Image intake: file uploads normalized for the model, and live camera
//! capture with a shutter. The native camera backend is behind the `camera`
//! feature.

pub mod device;
pub mod file;
#[cfg(feature = "camera")]
pub mod native;

pub use device::{CameraBackend, CameraError, CameraFrame, CameraSession, CameraStream, DeviceCapture};
pub use file::ImageNormalizer;
#[cfg(feature = "camera")]
pub use native::NativeCameraBackend;
