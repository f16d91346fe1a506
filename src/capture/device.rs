//! # Device Capture
//!
//! Live camera capture with a manual shutter.
//!
//! ## Architecture
//!
//! 1. **CameraBackend Trait**: opens a stream on a device
//! 2. **CameraStream Trait**: snapshots frames and stops the hardware
//! 3. **CameraSession**: guard that stops its stream when dropped
//! 4. **DeviceCapture**: activation state machine the studio drives
//!
//! The hardware stream is released on every exit path: a successful
//! shutter, deactivation, or dropping the owner. A shutter takes the session
//! out of [`DeviceCapture`] while the frame is grabbed, so the capture state
//! stays unlocked for the duration of a slow snapshot. A failed activation
//! (permission denied, no device) is logged and leaves capture inactive so
//! the caller can fall back to uploads.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::file::ImageNormalizer;
use crate::core::{ImagePayload, ImageRole};
use crate::error::{TryOnError, TryOnResult};

/// A raw RGB8 frame, rows tightly packed.
#[derive(Clone, PartialEq, Eq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("frame capture failed: {0}")]
    Frame(String),
}

/// Opens camera streams.
pub trait CameraBackend: Send + Sync {
    /// Acquire the device and start streaming.
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A running camera stream.
pub trait CameraStream: Send {
    /// Grab the current frame.
    fn snapshot(&mut self) -> Result<CameraFrame, CameraError>;

    /// Stop the hardware stream. Must be idempotent.
    fn stop(&mut self);
}

/// Owns one open stream and stops it on drop.
pub struct CameraSession {
    stream: Box<dyn CameraStream>,
}

impl CameraSession {
    pub fn open(backend: &dyn CameraBackend) -> Result<Self, CameraError> {
        let stream = backend.open()?;
        Ok(Self { stream })
    }

    pub fn snapshot(&mut self) -> Result<CameraFrame, CameraError> {
        self.stream.snapshot()
    }

    /// Grab a frame and normalize it as a person image. Blocks on the device.
    pub fn capture(&mut self, normalizer: &ImageNormalizer) -> TryOnResult<ImagePayload> {
        let frame = self
            .snapshot()
            .map_err(|e| TryOnError::camera(e.to_string()).with_operation("shutter"))?;
        normalizer.normalize_rgb(ImageRole::Person, frame.width, frame.height, frame.rgb)
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession").finish_non_exhaustive()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stream.stop();
        debug!("camera stream stopped");
    }
}

/// Camera activation state plus the shutter.
pub struct DeviceCapture {
    backend: Option<Arc<dyn CameraBackend>>,
    session: Option<CameraSession>,
    /// A shutter holds the session; cleared when capture is turned off meanwhile.
    shooting: bool,
    normalizer: ImageNormalizer,
}

impl DeviceCapture {
    pub fn new(backend: Option<Arc<dyn CameraBackend>>, normalizer: ImageNormalizer) -> Self {
        Self {
            backend,
            session: None,
            shooting: false,
            normalizer,
        }
    }

    /// Capture without a camera; activation always falls back.
    pub fn unavailable(normalizer: ImageNormalizer) -> Self {
        Self::new(None, normalizer)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some() || self.shooting
    }

    /// Start the live stream. Returns whether capture is now active.
    ///
    /// Failures are logged at `warn` and leave capture inactive.
    pub fn activate(&mut self) -> bool {
        if self.is_active() {
            return true;
        }
        let Some(backend) = self.backend.as_deref() else {
            warn!("no camera backend configured; staying on the upload path");
            return false;
        };
        match CameraSession::open(backend) {
            Ok(session) => {
                info!("camera stream started");
                self.session = Some(session);
                true
            }
            Err(e) => {
                warn!(error = %e, "camera activation failed; staying on the upload path");
                false
            }
        }
    }

    /// End capture mode, stopping the stream if one is open.
    /// A shutter in flight is cancelled; its stream stops when it returns.
    pub fn deactivate(&mut self) {
        let shooting = std::mem::take(&mut self.shooting);
        if self.session.take().is_some() || shooting {
            info!("camera deactivated");
        }
    }

    /// Flip between active and inactive. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.deactivate();
            false
        } else {
            self.activate()
        }
    }

    /// Hand the open session out for a snapshot taken off the lock.
    ///
    /// Capture stays active until [`DeviceCapture::end_shutter`].
    pub fn begin_shutter(&mut self) -> TryOnResult<(CameraSession, ImageNormalizer)> {
        if self.shooting {
            return Err(TryOnError::camera("a photo is already being taken"));
        }
        let session = self.session.take().ok_or_else(|| {
            TryOnError::camera("camera is not active")
                .with_recovery_suggestion("activate the camera before taking a photo")
        })?;
        self.shooting = true;
        Ok((session, self.normalizer))
    }

    /// Return the session after a snapshot. Returns whether the shot is still
    /// wanted, i.e. capture was not turned off while the frame was grabbed.
    ///
    /// A successful shot ends capture mode. A failed one keeps the stream open
    /// so the user can try again. A lost session (`None`) ends capture.
    pub fn end_shutter(&mut self, session: Option<CameraSession>, captured: bool) -> bool {
        if !std::mem::take(&mut self.shooting) {
            debug!("shutter finished after capture was turned off");
            return false;
        }
        match session {
            Some(session) if !captured => self.session = Some(session),
            Some(session) => {
                drop(session);
                info!("photo taken; camera deactivated");
            }
            None => warn!("camera session lost during shutter"),
        }
        true
    }
}

impl std::fmt::Debug for DeviceCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCapture")
            .field("has_backend", &self.has_backend())
            .field("active", &self.is_active())
            .finish()
    }
}
