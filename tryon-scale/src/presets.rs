// SPDX-License-Identifier: MIT
//! # Upload Presets and Plan Computation
//!
//! Computes the output size for a photo before upload. A plan is pure
//! arithmetic over dimensions; the pixels are handled by [`crate::cpu`].
//!
//! ## Design Philosophy
//!
//! 1. **ScaleTarget**: the size constraint (longest side, bounding box, or none)
//! 2. **ScalePlan**: the computed output for one input
//! 3. **UploadPreset**: which targets apply to the person template and to the
//!    garment references
//!
//! ## Rounding
//!
//! - Computations use `f64` and round to the nearest pixel
//! - No upscaling: images smaller than the target are left unchanged
//! - Every side is clamped to at least 1px

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Size constraint applied when planning a downscale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side, derive the other side proportionally.
    MaxLongSide(u32),
    /// Fit entirely inside a bounding box, preserving aspect ratio.
    Within(Size),
    /// Keep the input size.
    Unbounded,
}

/// Output of [`build_plan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target constraint used for planning
    pub target: ScaleTarget,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the image at its input size.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute the output dimensions for `input` under `target`.
///
/// # Arguments
/// * `input` - Source image dimensions
/// * `target` - Size constraint to apply
///
/// # Returns
/// A ScalePlan whose `out` never exceeds `input` on either side
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    let (w, h) = match target {
        ScaleTarget::MaxLongSide(max_side) => fit_preserve(input, max_side),
        ScaleTarget::Within(bounds) => fit_within(input, bounds),
        ScaleTarget::Unbounded => (input.w, input.h),
    };
    ScalePlan {
        input,
        target,
        out: Size { w, h },
    }
}

/// Clamp the longest side to `max_long`, scaling the other side with it.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h).max(1.0);
    let s = (max_long as f64 / long).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Fit within a bounding box while preserving aspect ratio.
fn fit_within(input: Size, bounds: Size) -> (u32, u32) {
    let (w, h) = (input.w.max(1) as f64, input.h.max(1) as f64);
    let (bw, bh) = (bounds.w as f64, bounds.h as f64);
    let s = (bw / w).min(bh / h).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Portrait frame requested from the camera; the person template is fitted into it.
pub const PORTRAIT_FRAME: Size = Size { w: 768, h: 1024 };

/// Upload presets trading request size against detail kept for the model.
///
/// The person template and the garment references are sized separately:
/// the template keeps a portrait frame, garments only clamp their long side
/// so logos and prints stay legible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UploadPreset {
    /// Person within 768×1024, garments with long side ≤ 1024
    #[default]
    Balanced,
    /// Person and garments with long side ≤ 640
    Compact,
    /// Upload at the decoded size
    Original,
}

impl UploadPreset {
    /// Target for the person (identity/background template) image.
    pub fn person_target(self) -> ScaleTarget {
        match self {
            UploadPreset::Balanced => ScaleTarget::Within(PORTRAIT_FRAME),
            UploadPreset::Compact => ScaleTarget::MaxLongSide(640),
            UploadPreset::Original => ScaleTarget::Unbounded,
        }
    }

    /// Target for garment reference images.
    pub fn garment_target(self) -> ScaleTarget {
        match self {
            UploadPreset::Balanced => ScaleTarget::MaxLongSide(1024),
            UploadPreset::Compact => ScaleTarget::MaxLongSide(640),
            UploadPreset::Original => ScaleTarget::Unbounded,
        }
    }
}
