// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out, tightly packed rows on both sides.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeOptions, Resizer};

use crate::presets::ScalePlan;

#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    #[error("Source buffer holds {got} bytes, plan expects {expected}")]
    SourceSize { expected: usize, got: usize },
    #[error("Output buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    #[error("Fast image resize error: {0}")]
    Fir(#[from] fir::ResizeError),
    #[error("Image buffer error: {0}")]
    ImageBuf(#[from] fir::ImageBufferError),
}

/// Scale `src_rgba` according to `plan`, writing into `dst`.
///
/// `src_rgba` must be exactly `plan.input.w * plan.input.h * 4` bytes and
/// `dst` at least `plan.out.w * plan.out.h * 4` bytes.
pub fn scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = rgba_len(plan.input.w, plan.input.h);
    if src_rgba.len() != src_len {
        return Err(ScaleError::SourceSize {
            expected: src_len,
            got: src_rgba.len(),
        });
    }
    let dst_len = rgba_len(plan.out.w, plan.out.h);
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall {
            needed: dst_len,
            got: dst.len(),
        });
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(plan.input.w, plan.input.h, src_rgba)?;
    let mut dst_image =
        TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Photos are opaque; skip alpha premultiplication.
    let opts = ResizeOptions::new().use_alpha(false);
    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// Allocating convenience wrapper around [`scale_rgba_cpu`].
///
/// Returns a copy of the input when the plan is an identity.
pub fn scale_rgba(src_rgba: &[u8], plan: &ScalePlan) -> Result<Vec<u8>, ScaleError> {
    if plan.is_identity() {
        return Ok(src_rgba.to_vec());
    }
    let mut resizer = Resizer::new();
    let mut dst = vec![0u8; rgba_len(plan.out.w, plan.out.h)];
    scale_rgba_cpu(&mut resizer, src_rgba, plan, &mut dst)?;
    Ok(dst)
}

#[inline]
fn rgba_len(w: u32, h: u32) -> usize {
    (w as usize) * (h as usize) * 4
}
