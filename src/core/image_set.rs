//! Image roles, personas and the set of images a run is built from.

use std::fmt;

use serde::Serialize;

use super::payload::ImagePayload;

/// Role an uploaded image plays in a try-on run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    /// Identity and background template
    Person,
    /// Upper-body garment reference
    Top,
    /// Lower-body garment reference
    Bottom,
    /// One-piece outfit reference
    Dress,
}

impl ImageRole {
    /// Garment roles in the order they are sent to the model.
    pub const GARMENTS: [ImageRole; 3] = [ImageRole::Top, ImageRole::Bottom, ImageRole::Dress];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageRole::Person => "person",
            ImageRole::Top => "top",
            ImageRole::Bottom => "bottom",
            ImageRole::Dress => "dress",
        }
    }

    pub fn is_garment(self) -> bool {
        self != ImageRole::Person
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persona/category selection. Decides which garment slots are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Persona {
    #[default]
    Men,
    Women,
}

impl Persona {
    /// Whether this persona offers a slot for `role`.
    ///
    /// Only `Women` adds the one-piece dress slot.
    pub fn offers(self, role: ImageRole) -> bool {
        match role {
            ImageRole::Dress => self == Persona::Women,
            _ => true,
        }
    }

    /// Garment slots offered by this persona, in upload order.
    pub fn garment_roles(self) -> impl Iterator<Item = ImageRole> {
        ImageRole::GARMENTS
            .into_iter()
            .filter(move |role| self.offers(*role))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Men => "MEN",
            Persona::Women => "WOMEN",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four optional image slots of a run.
///
/// `top`/`bottom` (two-piece) and `dress` (one-piece) may coexist; the model
/// receives whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    pub person: Option<ImagePayload>,
    pub top: Option<ImagePayload>,
    pub bottom: Option<ImagePayload>,
    pub dress: Option<ImagePayload>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: ImageRole) -> Option<&ImagePayload> {
        self.slot(role).as_ref()
    }

    /// Store `payload` under `role`, returning the image it replaced.
    pub fn set(&mut self, role: ImageRole, payload: ImagePayload) -> Option<ImagePayload> {
        self.slot_mut(role).replace(payload)
    }

    pub fn remove(&mut self, role: ImageRole) -> Option<ImagePayload> {
        self.slot_mut(role).take()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn has_person(&self) -> bool {
        self.person.is_some()
    }

    pub fn has_garment(&self) -> bool {
        ImageRole::GARMENTS.iter().any(|role| self.get(*role).is_some())
    }

    /// Readiness invariant: a person and at least one garment.
    pub fn is_ready(&self) -> bool {
        self.has_person() && self.has_garment()
    }

    /// Why the set is not ready, if it isn't.
    pub fn missing_requirement(&self) -> Option<&'static str> {
        if !self.has_person() {
            Some("a person image is required")
        } else if !self.has_garment() {
            Some("at least one garment image (top, bottom or dress) is required")
        } else {
            None
        }
    }

    /// Present garments in upload order: top, bottom, dress.
    pub fn garments(&self) -> impl Iterator<Item = (ImageRole, &ImagePayload)> {
        ImageRole::GARMENTS
            .into_iter()
            .filter_map(move |role| self.get(role).map(|payload| (role, payload)))
    }

    /// Number of images present, person included.
    pub fn len(&self) -> usize {
        usize::from(self.has_person()) + self.garments().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, role: ImageRole) -> &Option<ImagePayload> {
        match role {
            ImageRole::Person => &self.person,
            ImageRole::Top => &self.top,
            ImageRole::Bottom => &self.bottom,
            ImageRole::Dress => &self.dress,
        }
    }

    fn slot_mut(&mut self, role: ImageRole) -> &mut Option<ImagePayload> {
        match role {
            ImageRole::Person => &mut self.person,
            ImageRole::Top => &mut self.top,
            ImageRole::Bottom => &mut self.bottom,
            ImageRole::Dress => &mut self.dress,
        }
    }
}
