//! # Synthesis Stage
//!
//! Renders the try-on image. The person image is sent as the identity and
//! background template, each present garment follows with its own label, and
//! a fixed block of sleeve-fidelity rules closes the request with the
//! analysis directive interpolated as blending context.
//!
//! The first inline image of the first candidate is the result.

use std::sync::Arc;

use tracing::{info, warn};

use super::GenerativeBackend;
use super::analysis::BodySize;
use super::wire::{GenerateContentRequest, Part};
use crate::core::{ImagePayload, ImageRole, ImageSet, Persona};
use crate::error::{TryOnError, TryOnResult};

pub const TEMPLATE_LABEL: &str = "TEMPLATE: Master image for identity and background.";

/// Label sent ahead of a garment image.
pub fn garment_label(role: ImageRole) -> &'static str {
    match role {
        ImageRole::Top => "REFERENCE GARMENT: Map this EXACT design onto the person.",
        ImageRole::Bottom => "REFERENCE BOTTOM: Map this EXACT design.",
        ImageRole::Dress => "REFERENCE DRESS: Map this EXACT design.",
        ImageRole::Person => TEMPLATE_LABEL,
    }
}

/// Closing rules block.
pub fn critical_instruction(directive: &str, body_size: BodySize, persona: Persona) -> String {
    format!(
        "CRITICAL INSTRUCTION: Sleeve Length Fidelity.\n\
         - DO NOT default to the sleeve length of the original clothing in the template.\n\
         - If the REFERENCE garment is short-sleeved (half-hands), you MUST render the person's actual arms/skin below the sleeve.\n\
         - Do NOT stretch the reference garment to cover long sleeves if the reference itself is a t-shirt.\n\
         - Maintain 1:1 texture and logo alignment.\n\
         - Preserve all foreground occlusions (hands, watches, accessories).\n\
         - TARGET FIT: size {body_size} on a {persona} subject.\n\
         - BLENDING CONTEXT: {directive}\n"
    )
}

/// Build the synthesis request for `images`.
pub fn build_request(
    images: &ImageSet,
    directive: &str,
    body_size: BodySize,
    persona: Persona,
) -> TryOnResult<GenerateContentRequest> {
    let person = images
        .person
        .as_ref()
        .ok_or_else(|| TryOnError::synthesis("a person image is required"))?;

    let mut parts = vec![Part::text(TEMPLATE_LABEL), Part::image(person)];
    for (role, payload) in images.garments() {
        parts.push(Part::text(garment_label(role)));
        parts.push(Part::image(payload));
    }
    parts.push(Part::text(critical_instruction(directive, body_size, persona)));

    Ok(GenerateContentRequest::user(parts))
}

/// Client for the synthesis stage.
#[derive(Clone)]
pub struct SynthesisClient {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl SynthesisClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the synthesis request once.
    ///
    /// # Errors
    /// Transport failures and responses without an inline image are returned
    /// as [`TryOnError::Synthesis`]. There is no retry.
    pub async fn synthesize(
        &self,
        images: &ImageSet,
        directive: &str,
        body_size: BodySize,
        persona: Persona,
    ) -> TryOnResult<ImagePayload> {
        let request = build_request(images, directive, body_size, persona)?;
        info!(
            model = %self.model,
            %persona,
            %body_size,
            images = request.inline_images().count(),
            "requesting synthesis"
        );

        let response = self
            .backend
            .generate_content(&self.model, &request)
            .await
            .map_err(|e| TryOnError::synthesis(e.to_string()).with_metadata("model", &self.model))?;

        match response.first_inline_image() {
            Some(inline) => inline.to_payload().map_err(|e| {
                TryOnError::synthesis(format!("inline image could not be decoded: {e}"))
            }),
            None => {
                warn!(
                    finish_reason = response.finish_reason().unwrap_or("unknown"),
                    "synthesis returned no image"
                );
                Err(TryOnError::synthesis("synthesis produced an empty result")
                    .with_recovery_suggestion("retry with a clearer person photo or garment image"))
            }
        }
    }
}
