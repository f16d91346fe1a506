// SPDX-License-Identifier: MIT
//! # tryon-scale: Upload Sizing for Try-On Payloads
//!
//! This crate decides how large a person or garment photo may be before it is
//! sent to the remote model, and performs the downscale on the CPU.
//!
//! ## Architecture Overview
//!
//! 1. **Plans, not pixels**: [`presets::build_plan`] computes output dimensions
//!    from the input size and a [`presets::ScaleTarget`] without touching data
//! 2. **SIMD acceleration**: [`cpu`] runs the plan through `fast_image_resize`
//! 3. **Role-aware presets**: [`presets::UploadPreset`] picks a target per image
//!    role (person template vs garment reference)
//!
//! ## Key Components
//!
//! - [`presets`]: Size planning and upload presets
//! - [`cpu`]: RGBA8 CPU scaling
//!
//! ## Sizing Rules
//!
//! - Images are never upscaled
//! - Aspect ratio is always preserved
//! - The person template fits inside 768×1024 by default, matching the
//!   camera's requested frame
//!
//! ## Usage Example
//!
//! ```rust
//! use tryon_scale::{cpu::scale_rgba, presets::{build_plan, Size, UploadPreset}};
//!
//! let input = Size { w: 1536, h: 2048 };
//! let plan = build_plan(input, UploadPreset::Balanced.person_target());
//! assert_eq!(plan.out, Size { w: 768, h: 1024 });
//!
//! let rgba = vec![0u8; (input.w * input.h * 4) as usize];
//! let scaled = scale_rgba(&rgba, &plan)?;
//! assert_eq!(scaled.len(), (768 * 1024 * 4) as usize);
//! # Ok::<(), tryon_scale::cpu::ScaleError>(())
//! ```

pub mod cpu;
pub mod presets;
