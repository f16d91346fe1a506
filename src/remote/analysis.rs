//! # Analysis Stage
//!
//! Structured analysis of the person and garment references: pose mapping,
//! spatial boundaries of worn clothing, sleeve-length classification,
//! occlusion mapping and outfit coordination. The model answers with JSON
//! constrained by [`response_schema`], decoded into [`AnalysisResult`].
//!
//! Request layout: instruction text, person image, then each present garment
//! in the fixed order top, bottom, dress.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::GenerativeBackend;
use super::wire::{GenerateContentRequest, GenerationConfig, Part};
use crate::core::{ImageSet, Persona};
use crate::error::{TryOnError, TryOnResult};

/// Estimated body size of the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodySize {
    S,
    #[default]
    M,
    L,
}

impl BodySize {
    pub fn as_str(self) -> &'static str {
        match self {
            BodySize::S => "S",
            BodySize::M => "M",
            BodySize::L => "L",
        }
    }
}

impl fmt::Display for BodySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outfit coordination hints. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylingSuggestions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_pants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_shoes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_shirt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_vibe: Option<String>,
}

impl StylingSuggestions {
    /// The piece to pair with the outfit.
    ///
    /// Shoes complete a dress; otherwise pants are preferred over a shirt.
    pub fn coordinated_piece(&self, has_dress: bool) -> Option<&str> {
        if has_dress {
            self.suggested_shoes.as_deref()
        } else {
            self.suggested_pants
                .as_deref()
                .or(self.suggested_shirt.as_deref())
        }
    }
}

/// Decoded analysis response.
///
/// The three descriptions are required; a missing one fails the stage.
/// `body_size` is tolerated as absent and resolved with [`AnalysisResult::body_size_or_default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub garment_description: String,
    pub person_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_size: Option<BodySize>,
    pub technical_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling_suggestions: Option<StylingSuggestions>,
}

impl AnalysisResult {
    pub fn body_size_or_default(&self) -> BodySize {
        self.body_size.unwrap_or_default()
    }

    /// Parse the JSON text returned by the model.
    pub fn from_json(text: &str) -> TryOnResult<Self> {
        serde_json::from_str(text.trim()).map_err(|e| {
            TryOnError::analysis(format!("response does not match the analysis schema: {e}"))
        })
    }
}

/// Instruction block sent ahead of the images.
pub fn instruction(persona: Persona) -> String {
    format!(
        "Act as a Neural Fashion Stylist and Research Engineer.\n\
         TASK: Execute 'Semantic Alignment' and 'Outfit Coordination Analysis'.\n\
         \n\
         1. POSE ESTIMATION: Map the skeletal structure for this {persona} subject.\n\
         2. SPATIAL BOUNDARIES: Identify where the person is currently wearing clothes.\n\
         3. SLEEVE LENGTH DETECTION: Precisely determine if the PROVIDED reference garments (Top or Dress) have short, half, or long sleeves.\n\
         4. OCCLUSION MAPPING: Identify foreground elements (hands, hair, accessories) that must stay in front of the new garment.\n\
         5. COORDINATION: Suggest matching pants/shoes based on the garment's 'vibe'.\n"
    )
}

/// JSON schema constraining the analysis response.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "garmentDescription": {"type": "STRING"},
            "personDescription": {"type": "STRING"},
            "bodySize": {"type": "STRING", "enum": ["S", "M", "L"]},
            "technicalPrompt": {"type": "STRING"},
            "stylingSuggestions": {
                "type": "OBJECT",
                "properties": {
                    "suggestedPants": {"type": "STRING"},
                    "suggestedShoes": {"type": "STRING"},
                    "suggestedShirt": {"type": "STRING"},
                    "styleVibe": {"type": "STRING"}
                }
            }
        },
        "required": [
            "garmentDescription",
            "personDescription",
            "bodySize",
            "technicalPrompt",
            "stylingSuggestions"
        ]
    })
}

/// Build the analysis request for `images`.
pub fn build_request(images: &ImageSet, persona: Persona) -> TryOnResult<GenerateContentRequest> {
    let person = images
        .person
        .as_ref()
        .ok_or_else(|| TryOnError::analysis("a person image is required"))?;

    let mut parts = vec![Part::text(instruction(persona)), Part::image(person)];
    parts.extend(images.garments().map(|(_, payload)| Part::image(payload)));

    Ok(
        GenerateContentRequest::user(parts).with_generation_config(GenerationConfig {
            temperature: Some(0.0),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(response_schema()),
            response_modalities: None,
        }),
    )
}

/// Client for the analysis stage.
#[derive(Clone)]
pub struct AnalysisClient {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl AnalysisClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the analysis request once.
    ///
    /// # Errors
    /// Any transport failure, empty response or schema violation is returned
    /// as [`TryOnError::Analysis`]. There is no retry.
    pub async fn analyze(&self, images: &ImageSet, persona: Persona) -> TryOnResult<AnalysisResult> {
        let request = build_request(images, persona)?;
        info!(
            model = %self.model,
            %persona,
            images = request.inline_images().count(),
            "requesting analysis"
        );

        let response = self
            .backend
            .generate_content(&self.model, &request)
            .await
            .map_err(|e| TryOnError::analysis(e.to_string()).with_metadata("model", &self.model))?;

        let text = response.text().ok_or_else(|| {
            TryOnError::analysis("model returned no text")
                .with_metadata("finish_reason", response.finish_reason().unwrap_or("unknown"))
        })?;

        let result = AnalysisResult::from_json(&text)?;
        debug!(
            body_size = ?result.body_size,
            has_styling = result.styling_suggestions.is_some(),
            "analysis decoded"
        );
        Ok(result)
    }
}
