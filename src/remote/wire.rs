//! Serde model of the `generateContent` request and response bodies.
//!
//! Only the fields this crate sends or reads are modeled; unknown response
//! fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ImagePayload;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single user turn made of `parts`.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: None,
        }
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// All parts of all turns, in order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.contents.iter().flat_map(|content| content.parts.iter())
    }

    /// Inline images of the request, in order.
    pub fn inline_images(&self) -> impl Iterator<Item = &InlineData> {
        self.parts().filter_map(|part| part.inline_data.as_ref())
    }

    /// Text parts of the request, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts().filter_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One element of a multimodal turn: text or an inline image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "inline_data"
    )]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(payload: &ImagePayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: payload.mime_type().to_string(),
                data: payload.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl InlineData {
    pub fn to_payload(&self) -> crate::error::TryOnResult<ImagePayload> {
        ImagePayload::from_base64(self.mime_type.clone(), &self.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<Value>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate.
    pub fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// First inline image of the first candidate.
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Finish reason of the first candidate, for diagnostics.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}
