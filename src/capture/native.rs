//! Native camera backend on `nokhwa`.
//!
//! The device handle is not `Send` on every platform, so each stream owns a
//! dedicated thread that opens the camera, serves snapshot requests over a
//! channel and closes the stream when told to stop or when the channel
//! disconnects.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use tracing::{debug, warn};

use super::device::{CameraBackend, CameraError, CameraFrame, CameraStream};

enum Command {
    Snapshot(mpsc::Sender<Result<CameraFrame, CameraError>>),
    Stop,
}

/// Opens camera `index` through the platform's native API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCameraBackend {
    index: u32,
}

impl NativeCameraBackend {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl CameraBackend for NativeCameraBackend {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let index = self.index;

        let handle = thread::Builder::new()
            .name("tryon-camera".to_string())
            .spawn(move || camera_thread(index, ready_tx, command_rx))
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(NativeStream {
                commands: command_tx,
                handle: Some(handle),
            })),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraError::Unavailable("camera thread exited".to_string()))
            }
        }
    }
}

fn camera_thread(
    index: u32,
    ready: mpsc::Sender<Result<(), CameraError>>,
    commands: mpsc::Receiver<Command>,
) {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(CameraIndex::Index(index), format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(classify_open_error(e.to_string())));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(classify_open_error(e.to_string())));
        return;
    }
    if ready.send(Ok(())).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    while let Ok(Command::Snapshot(reply)) = commands.recv() {
        let _ = reply.send(grab(&mut camera));
    }

    if let Err(e) = camera.stop_stream() {
        warn!(error = %e, "camera stream did not stop cleanly");
    }
    debug!(index, "camera thread finished");
}

fn grab(camera: &mut Camera) -> Result<CameraFrame, CameraError> {
    let buffer = camera
        .frame()
        .map_err(|e| CameraError::Frame(e.to_string()))?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CameraError::Frame(e.to_string()))?;
    Ok(CameraFrame {
        width: decoded.width(),
        height: decoded.height(),
        rgb: decoded.into_raw(),
    })
}

fn classify_open_error(message: String) -> CameraError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CameraError::PermissionDenied
    } else {
        CameraError::Unavailable(message)
    }
}

struct NativeStream {
    commands: mpsc::Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl CameraStream for NativeStream {
    fn snapshot(&mut self) -> Result<CameraFrame, CameraError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(Command::Snapshot(reply_tx))
            .map_err(|_| CameraError::Frame("camera thread is gone".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| CameraError::Frame("camera thread is gone".to_string()))?
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.commands.send(Command::Stop);
        if handle.join().is_err() {
            warn!("camera thread panicked");
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}
