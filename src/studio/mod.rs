//! # Try-On Studio
//!
//! The single controller that owns the persona, the image set, the camera and
//! the workflow state, and drives a run through its two remote stages.
//!
//! ## Architecture
//!
//! 1. **Studio**: cheap-to-clone handle; all state lives behind one `Arc`
//! 2. **StudioBuilder**: fluent configuration of backend, camera and persona
//! 3. **WorkflowState**: published through a `tokio::sync::watch` channel
//!
//! ## Run Lifecycle
//!
//! `run` checks readiness (a person and at least one garment), enters
//! `processing`, switches the view to the result canvas, then awaits
//! analysis and synthesis strictly in sequence. Either stage failing ends
//! the run in `error` with the message; analysis fields merged before the
//! failure are kept.
//!
//! Every run is tagged with a generation. Persona changes and resets bump
//! it, so a run that resolves after the user moved on is discarded instead
//! of overwriting the fresh state. The remote call itself is not cancelled.
//!
//! Locks are `std::sync::Mutex` and are never held across an `.await`.

pub mod state;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capture::{CameraBackend, DeviceCapture, ImageNormalizer};
use crate::config::TryOnConfig;
use crate::config::config::{DEFAULT_ANALYSIS_MODEL, DEFAULT_SYNTHESIS_MODEL};
use crate::core::{ImagePayload, ImageRole, ImageSet, Persona};
use crate::error::{TryOnError, TryOnResult};
use crate::remote::{AnalysisClient, GeminiBackend, GenerativeBackend, SynthesisClient};
use tryon_scale::presets::UploadPreset;

pub use state::{ActiveView, PipelineStage, StageStatus, WorkflowState, WorkflowStatus};

/// File name used when saving a synthesized image.
pub const RESULT_FILENAME: &str = "neural-try-on-asset.png";

struct Selection {
    persona: Persona,
    images: ImageSet,
    view: ActiveView,
    generation: u64,
}

struct StudioInner {
    selection: Mutex<Selection>,
    camera: Mutex<DeviceCapture>,
    state: watch::Sender<WorkflowState>,
    analysis: AnalysisClient,
    synthesis: SynthesisClient,
    normalizer: ImageNormalizer,
}

/// Handle to a try-on studio. Clones share the same state.
#[derive(Clone)]
pub struct Studio {
    inner: Arc<StudioInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Studio {
    pub fn builder() -> StudioBuilder {
        StudioBuilder::new()
    }

    pub fn persona(&self) -> Persona {
        lock(&self.inner.selection).persona
    }

    /// Switch persona. A change clears every image, returns the workflow to
    /// `idle`, shows the inputs and turns the camera off.
    pub fn select_persona(&self, persona: Persona) {
        {
            let mut selection = lock(&self.inner.selection);
            if selection.persona == persona {
                return;
            }
            selection.persona = persona;
            selection.images.clear();
            selection.view = ActiveView::Inputs;
            selection.generation += 1;
            self.inner.state.send_replace(WorkflowState::idle());
            info!(%persona, generation = selection.generation, "persona changed");
        }
        lock(&self.inner.camera).deactivate();
    }

    /// Clear images and results and return to `idle`. The camera is left as is.
    pub fn reset(&self) {
        let mut selection = lock(&self.inner.selection);
        selection.images.clear();
        selection.view = ActiveView::Inputs;
        selection.generation += 1;
        self.inner.state.send_replace(WorkflowState::idle());
        info!(generation = selection.generation, "studio reset");
    }

    /// Store an already-normalized image under `role`.
    ///
    /// # Errors
    /// [`TryOnError::Validation`] when the current persona offers no slot for `role`.
    pub fn set_image(&self, role: ImageRole, payload: ImagePayload) -> TryOnResult<()> {
        let mut selection = lock(&self.inner.selection);
        ensure_offered(selection.persona, role)?;
        debug!(%role, bytes = payload.len(), "image stored");
        selection.images.set(role, payload);
        Ok(())
    }

    /// Decode and normalize uploaded bytes, then store them under `role`.
    ///
    /// Bytes that fail to decode leave the image set untouched.
    pub async fn load_image(&self, role: ImageRole, bytes: Vec<u8>) -> TryOnResult<()> {
        ensure_offered(self.persona(), role)?;

        let normalizer = self.inner.normalizer;
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(role, &bytes))
            .await
            .map_err(|e| TryOnError::capture(role.as_str(), format!("decode task failed: {e}")))?;

        match normalized {
            Ok(payload) => self.set_image(role, payload),
            Err(e) => {
                warn!(%role, error = %e, "upload rejected");
                Err(e)
            }
        }
    }

    /// Read an image file and store it under `role`.
    pub async fn load_image_path(&self, role: ImageRole, path: impl AsRef<Path>) -> TryOnResult<()> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TryOnError::io("read image", e).with_context(path.display().to_string())
        })?;
        self.load_image(role, bytes).await
    }

    /// Snapshot of the current image set.
    pub fn images(&self) -> ImageSet {
        lock(&self.inner.selection).images.clone()
    }

    /// Whether `run` would start a run right now.
    pub fn can_run(&self) -> bool {
        let selection = lock(&self.inner.selection);
        selection.images.is_ready() && self.inner.state.borrow().status != WorkflowStatus::Processing
    }

    /// Turn the camera on or off. Returns whether it is now active.
    ///
    /// Activation failure is not an error: the studio stays on the upload path.
    pub fn toggle_camera(&self) -> bool {
        lock(&self.inner.camera).toggle()
    }

    pub fn camera_active(&self) -> bool {
        lock(&self.inner.camera).is_active()
    }

    /// Take a photo with the active camera and store it as the person image.
    /// Capture mode ends on success.
    ///
    /// The device is read off the camera lock, so toggling the camera or
    /// changing persona meanwhile does not wait for the frame. Either one
    /// cancels the shot.
    pub async fn capture_photo(&self) -> TryOnResult<()> {
        let (mut session, normalizer) = lock(&self.inner.camera).begin_shutter()?;
        let shot = tokio::task::spawn_blocking(move || {
            let payload = session.capture(&normalizer);
            (session, payload)
        })
        .await;

        let (session, payload) = match shot {
            Ok((session, payload)) => (Some(session), payload),
            Err(e) => (None, Err(TryOnError::camera(format!("shutter task failed: {e}")))),
        };
        let wanted = lock(&self.inner.camera).end_shutter(session, payload.is_ok());
        let payload = payload?;
        if !wanted {
            return Err(TryOnError::camera("capture was turned off before the photo was stored"));
        }
        self.set_image(ImageRole::Person, payload)
    }

    pub fn active_view(&self) -> ActiveView {
        lock(&self.inner.selection).view
    }

    pub fn set_active_view(&self, view: ActiveView) {
        lock(&self.inner.selection).view = view;
    }

    /// Current workflow state.
    pub fn state(&self) -> WorkflowState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.inner.state.subscribe()
    }

    /// Run analysis then synthesis on the current image set.
    ///
    /// Returns the state the run ended in. Stage failures are reported
    /// through that state, not as `Err`.
    ///
    /// # Errors
    /// [`TryOnError::Readiness`] when the set is not ready or a run is already
    /// in flight; nothing changes in that case.
    pub async fn run(&self) -> TryOnResult<WorkflowState> {
        let (generation, persona, images) = {
            let mut selection = lock(&self.inner.selection);
            if let Some(reason) = selection.images.missing_requirement() {
                return Err(TryOnError::readiness(reason));
            }
            if self.inner.state.borrow().status == WorkflowStatus::Processing {
                return Err(TryOnError::readiness("a run is already in progress"));
            }
            selection.view = ActiveView::Result;
            self.inner.state.send_replace(WorkflowState::processing());
            (selection.generation, selection.persona, selection.images.clone())
        };
        info!(generation, %persona, images = images.len(), "run started");

        let analysis = match self.inner.analysis.analyze(&images, persona).await {
            Ok(analysis) => analysis,
            Err(e) => return Ok(self.finish(generation, |state| state.failed(e.to_string()))),
        };
        let body_size = analysis.body_size_or_default();
        let merged = self.transition(generation, |state| state.with_analysis(&analysis));
        if merged.is_none() {
            return Ok(self.state());
        }
        info!(generation, %body_size, "analysis complete");

        let outcome = self
            .inner
            .synthesis
            .synthesize(&images, &analysis.technical_prompt, body_size, persona)
            .await;
        Ok(match outcome {
            Ok(image) => self.finish(generation, |state| state.succeeded(image)),
            Err(e) => self.finish(generation, |state| state.failed(e.to_string())),
        })
    }

    /// Apply `f` to the current state if `generation` is still current.
    fn transition(
        &self,
        generation: u64,
        f: impl FnOnce(WorkflowState) -> WorkflowState,
    ) -> Option<WorkflowState> {
        let selection = lock(&self.inner.selection);
        if selection.generation != generation {
            debug!(
                generation,
                current = selection.generation,
                "discarding result of a stale run"
            );
            return None;
        }
        let next = f(self.inner.state.borrow().clone());
        self.inner.state.send_replace(next.clone());
        Some(next)
    }

    fn finish(&self, generation: u64, f: impl FnOnce(WorkflowState) -> WorkflowState) -> WorkflowState {
        match self.transition(generation, f) {
            Some(state) => {
                match &state.error {
                    Some(message) => warn!(generation, error = %message, "run failed"),
                    None => info!(generation, "run succeeded"),
                }
                state
            }
            None => self.state(),
        }
    }

    /// Write the synthesized image to `dir/neural-try-on-asset.png`.
    ///
    /// Non-PNG results are converted before writing.
    pub async fn save_result(&self, dir: impl AsRef<Path>) -> TryOnResult<PathBuf> {
        let image = self.state().result_image.ok_or_else(|| {
            TryOnError::validation("result", "no synthesized image to save")
                .with_recovery_suggestion("run the studio to completion first")
        })?;

        let png = if image.mime_type() == "image/png" {
            image.bytes().to_vec()
        } else {
            tokio::task::spawn_blocking(move || to_png(&image))
                .await
                .map_err(|e| TryOnError::validation("result", format!("convert task failed: {e}")))??
        };

        let path = dir.as_ref().join(RESULT_FILENAME);
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| TryOnError::io("save result", e).with_context(path.display().to_string()))?;
        info!(path = %path.display(), "result saved");
        Ok(path)
    }

    /// Analysis telemetry as pretty-printed JSON.
    pub fn telemetry_json(&self) -> TryOnResult<String> {
        let (persona, view) = {
            let selection = lock(&self.inner.selection);
            (selection.persona, selection.view)
        };
        let state = self.state();
        let has_dress = self.images().dress.is_some();
        let report = Telemetry {
            persona,
            view,
            analysis_model: self.inner.analysis.model(),
            synthesis_model: self.inner.synthesis.model(),
            pipeline: state.pipeline(),
            coordinated_piece: state
                .styling_suggestions
                .as_ref()
                .and_then(|styling| styling.coordinated_piece(has_dress)),
            state: &state,
        };
        serde_json::to_string_pretty(&report)
            .map_err(|e| TryOnError::validation("telemetry", e.to_string()))
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let selection = lock(&self.inner.selection);
        f.debug_struct("Studio")
            .field("persona", &selection.persona)
            .field("images", &selection.images.len())
            .field("status", &self.inner.state.borrow().status)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Telemetry<'a> {
    persona: Persona,
    view: ActiveView,
    analysis_model: &'a str,
    synthesis_model: &'a str,
    pipeline: [PipelineStage; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    coordinated_piece: Option<&'a str>,
    #[serde(flatten)]
    state: &'a WorkflowState,
}

fn ensure_offered(persona: Persona, role: ImageRole) -> TryOnResult<()> {
    if persona.offers(role) {
        Ok(())
    } else {
        Err(TryOnError::validation(
            role.as_str(),
            format!("the {persona} persona has no {role} slot"),
        ))
    }
}

fn to_png(image: &ImagePayload) -> TryOnResult<Vec<u8>> {
    let decoded = image::load_from_memory(image.bytes())
        .map_err(|e| TryOnError::validation("result", format!("undecodable result image: {e}")))?;
    let mut out = Vec::new();
    decoded
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| TryOnError::validation("result", format!("png encode failed: {e}")))?;
    Ok(out)
}

/// Fluent configuration for a [`Studio`].
pub struct StudioBuilder {
    config: Option<TryOnConfig>,
    backend: Option<Arc<dyn GenerativeBackend>>,
    camera: Option<Arc<dyn CameraBackend>>,
    persona: Persona,
    analysis_model: String,
    synthesis_model: String,
    upload_preset: UploadPreset,
}

impl StudioBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            backend: None,
            camera: None,
            persona: Persona::default(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            upload_preset: UploadPreset::default(),
        }
    }

    /// Use `config` for models and preset, and for the REST backend unless
    /// one is supplied with [`StudioBuilder::with_backend`].
    pub fn with_config(mut self, config: TryOnConfig) -> Self {
        self.analysis_model = config.analysis_model.clone();
        self.synthesis_model = config.synthesis_model.clone();
        self.upload_preset = config.upload_preset;
        self.config = Some(config);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn CameraBackend>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// # Errors
    /// [`TryOnError::Configuration`] when neither a backend nor a valid
    /// configuration was supplied.
    pub fn build(self) -> TryOnResult<Studio> {
        let backend = match (self.backend, &self.config) {
            (Some(backend), _) => backend,
            (None, Some(config)) => {
                config.validate()?;
                Arc::new(GeminiBackend::from_config(config)?) as Arc<dyn GenerativeBackend>
            }
            (None, None) => {
                return Err(TryOnError::configuration(
                    "backend",
                    "a configuration or a generative backend is required",
                ));
            }
        };

        let normalizer = ImageNormalizer::new(self.upload_preset);
        let (state, _) = watch::channel(WorkflowState::idle());
        info!(
            persona = %self.persona,
            analysis_model = %self.analysis_model,
            synthesis_model = %self.synthesis_model,
            camera = self.camera.is_some(),
            "studio ready"
        );

        Ok(Studio {
            inner: Arc::new(StudioInner {
                selection: Mutex::new(Selection {
                    persona: self.persona,
                    images: ImageSet::new(),
                    view: ActiveView::Inputs,
                    generation: 0,
                }),
                camera: Mutex::new(DeviceCapture::new(self.camera, normalizer)),
                state,
                analysis: AnalysisClient::new(backend.clone(), self.analysis_model),
                synthesis: SynthesisClient::new(backend, self.synthesis_model),
                normalizer,
            }),
        })
    }
}

impl Default for StudioBuilder {
    fn default() -> Self {
        Self::new()
    }
}
