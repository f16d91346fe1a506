//! Image payloads as they travel between capture, the remote model and disk.

use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose};

use crate::error::{TryOnError, TryOnResult};

/// Mime type used for every normalized upload.
pub const JPEG_MIME: &str = "image/jpeg";

/// Encoded image bytes plus their mime type.
///
/// Bytes are reference-counted so a run can snapshot the current image set
/// without copying pixel data.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data: Arc<[u8]>,
}

impl ImagePayload {
    /// Wrap already-encoded bytes.
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Wrap JPEG bytes.
    pub fn jpeg(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new(JPEG_MIME, data)
    }

    /// Decode the base64 body of an inline payload.
    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> TryOnResult<Self> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| TryOnError::validation("inline image data", e.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parse a `data:<mime>;base64,<data>` URI.
    pub fn from_data_uri(uri: &str) -> TryOnResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| TryOnError::validation("data uri", "missing 'data:' scheme"))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| TryOnError::validation("data uri", "missing ',' separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| TryOnError::validation("data uri", "only base64 data uris are supported"))?;
        if mime_type.is_empty() {
            return Err(TryOnError::validation("data uri", "empty mime type"));
        }
        Self::from_base64(mime_type, body)
    }

    /// Render as a `data:` URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Base64 body without the data-uri header.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    // Never dump image bytes into logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}
