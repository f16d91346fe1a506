//! # Upload Normalization
//!
//! Turns arbitrary image bytes (a file upload or a camera frame) into the
//! payload format every model request uses: RGB JPEG, downscaled to the
//! bound the active [`UploadPreset`] sets for the image's role.
//!
//! ## Pipeline
//!
//! 1. Decode with `image` (format sniffed from the bytes)
//! 2. Plan the downscale with `tryon_scale::presets::build_plan`
//! 3. Resize RGBA with `tryon_scale::cpu::scale_rgba` (never upscales)
//! 4. Drop alpha and encode JPEG
//!
//! Decoding is CPU-bound; async callers run it under `spawn_blocking`.

use std::io::Cursor;

use image::{DynamicImage, RgbImage, RgbaImage, codecs::jpeg::JpegEncoder};
use tracing::debug;
use tryon_scale::{
    cpu::scale_rgba,
    presets::{ScaleTarget, Size, UploadPreset, build_plan},
};

use crate::core::{ImagePayload, ImageRole};
use crate::error::{TryOnError, TryOnResult};

/// JPEG quality of normalized payloads.
pub const JPEG_QUALITY: u8 = 90;

/// Decodes, bounds and re-encodes images for upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageNormalizer {
    preset: UploadPreset,
}

impl ImageNormalizer {
    pub fn new(preset: UploadPreset) -> Self {
        Self { preset }
    }

    pub fn preset(&self) -> UploadPreset {
        self.preset
    }

    fn target(&self, role: ImageRole) -> ScaleTarget {
        if role.is_garment() {
            self.preset.garment_target()
        } else {
            self.preset.person_target()
        }
    }

    /// Decode encoded image bytes and normalize them for `role`.
    ///
    /// # Errors
    /// Returns [`TryOnError::Capture`] when the bytes are not a decodable image.
    pub fn normalize(&self, role: ImageRole, bytes: &[u8]) -> TryOnResult<ImagePayload> {
        if bytes.is_empty() {
            return Err(TryOnError::capture(role.as_str(), "no image data"));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| TryOnError::capture(role.as_str(), format!("decode failed: {e}")))?;
        self.normalize_rgba(role, decoded.to_rgba8())
    }

    /// Normalize a raw RGB frame, e.g. a camera snapshot.
    pub fn normalize_rgb(
        &self,
        role: ImageRole,
        width: u32,
        height: u32,
        rgb: Vec<u8>,
    ) -> TryOnResult<ImagePayload> {
        let frame = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            TryOnError::capture(
                role.as_str(),
                format!("frame buffer does not match {width}x{height} RGB"),
            )
        })?;
        self.normalize_rgba(role, DynamicImage::ImageRgb8(frame).to_rgba8())
    }

    fn normalize_rgba(&self, role: ImageRole, rgba: RgbaImage) -> TryOnResult<ImagePayload> {
        let input = Size {
            w: rgba.width(),
            h: rgba.height(),
        };
        let plan = build_plan(input, self.target(role));

        let scaled = if plan.is_identity() {
            rgba
        } else {
            let pixels = scale_rgba(rgba.as_raw(), &plan)
                .map_err(|e| TryOnError::capture(role.as_str(), e.to_string()))?;
            RgbaImage::from_raw(plan.out.w, plan.out.h, pixels).ok_or_else(|| {
                TryOnError::capture(role.as_str(), "scaled buffer has the wrong length")
            })?
        };

        let rgb = DynamicImage::ImageRgba8(scaled).to_rgb8();
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut encoded), JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| TryOnError::capture(role.as_str(), format!("encode failed: {e}")))?;

        debug!(
            %role,
            from = ?(input.w, input.h),
            to = ?(plan.out.w, plan.out.h),
            bytes = encoded.len(),
            "normalized image"
        );
        Ok(ImagePayload::jpeg(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn dimensions(payload: &ImagePayload) -> (u32, u32) {
        let img = image::load_from_memory(payload.bytes()).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_normalize_produces_jpeg() {
        let payload = ImageNormalizer::default()
            .normalize(ImageRole::Top, &png(64, 48))
            .unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(dimensions(&payload), (64, 48));
    }

    #[test]
    fn test_person_is_bounded_to_portrait_frame() {
        let payload = ImageNormalizer::new(UploadPreset::Balanced)
            .normalize(ImageRole::Person, &png(1536, 1024))
            .unwrap();
        assert_eq!(dimensions(&payload), (768, 512));
    }

    #[test]
    fn test_original_preset_keeps_size() {
        let payload = ImageNormalizer::new(UploadPreset::Original)
            .normalize(ImageRole::Dress, &png(1300, 20))
            .unwrap();
        assert_eq!(dimensions(&payload), (1300, 20));
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let err = ImageNormalizer::default()
            .normalize(ImageRole::Person, b"definitely not an image")
            .unwrap_err();
        assert_eq!(err.category(), "capture");

        let err = ImageNormalizer::default()
            .normalize(ImageRole::Person, &[])
            .unwrap_err();
        assert_eq!(err.category(), "capture");
    }

    #[test]
    fn test_normalize_rgb_frame() {
        let frame = vec![128u8; 32 * 16 * 3];
        let payload = ImageNormalizer::default()
            .normalize_rgb(ImageRole::Person, 32, 16, frame)
            .unwrap();
        assert_eq!(dimensions(&payload), (32, 16));

        let err = ImageNormalizer::default()
            .normalize_rgb(ImageRole::Person, 32, 16, vec![0u8; 10])
            .unwrap_err();
        assert_eq!(err.category(), "capture");
    }
}
