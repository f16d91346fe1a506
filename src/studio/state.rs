//! Workflow state and its transitions.
//!
//! Every transition returns a new [`WorkflowState`]; the studio publishes it
//! wholesale, so observers never see a half-applied update.

use serde::Serialize;

use crate::core::ImagePayload;
use crate::remote::{AnalysisResult, BodySize, StylingSuggestions};

/// Lifecycle of a try-on run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Success | WorkflowStatus::Error)
    }
}

/// Which panel the UI shows: the inputs with telemetry, or the result canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Inputs,
    Result,
}

/// Snapshot of the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_size: Option<BodySize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styling_suggestions: Option<StylingSuggestions>,
    #[serde(skip)]
    pub result_image: Option<ImagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// A fresh run: no analysis, no image, no error.
    pub fn processing() -> Self {
        Self {
            status: WorkflowStatus::Processing,
            ..Self::default()
        }
    }

    /// Merge analysis fields; the run stays in `processing`.
    ///
    /// An absent body size is recorded as the default `M`.
    pub fn with_analysis(mut self, analysis: &AnalysisResult) -> Self {
        self.status = WorkflowStatus::Processing;
        self.garment_description = Some(analysis.garment_description.clone());
        self.person_description = Some(analysis.person_description.clone());
        self.body_size = Some(analysis.body_size_or_default());
        self.technical_prompt = Some(analysis.technical_prompt.clone());
        self.styling_suggestions = analysis.styling_suggestions.clone();
        self
    }

    pub fn succeeded(mut self, image: ImagePayload) -> Self {
        self.status = WorkflowStatus::Success;
        self.result_image = Some(image);
        self.error = None;
        self
    }

    /// Terminal failure. Merged analysis fields are kept.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = WorkflowStatus::Error;
        self.error = Some(message.into());
        self
    }

    /// Progress rows shown while a run is in flight.
    pub fn pipeline(&self) -> [PipelineStage; 3] {
        let processing = self.status == WorkflowStatus::Processing;
        let mapped = self.body_size.is_some();
        let aligned = self.garment_description.is_some();
        let rendered = self.status == WorkflowStatus::Success;

        [
            PipelineStage::new(
                "Spatial Mapping",
                StageStatus::derive(mapped, processing && !mapped),
            ),
            PipelineStage::new(
                "Feature Alignment",
                StageStatus::derive(aligned, mapped && !aligned),
            ),
            PipelineStage::new(
                "High-Fidelity Rendering",
                StageStatus::derive(rendered, processing && aligned),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Done,
}

impl StageStatus {
    fn derive(done: bool, active: bool) -> Self {
        if done {
            StageStatus::Done
        } else if active {
            StageStatus::Active
        } else {
            StageStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStage {
    pub name: &'static str,
    pub status: StageStatus,
}

impl PipelineStage {
    fn new(name: &'static str, status: StageStatus) -> Self {
        Self { name, status }
    }
}
