//! Booking seed: a pre-selection handed to the booking wizard.
//!
//! The chat assistant and the search box produce a seed when they identify
//! a specialty or a professional; the booking page's entry point can also
//! build one from its URL query (`specialty`, `categoryId`, `professionalId`, `step`).
//! The booking page consumes a seed once, when it initializes.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Professional};
use crate::text;
use crate::types::EntityId;

/// Persisted key holding the selected specialty name.
pub const STORAGE_KEY_SPECIALTY: &str = "selectedBookingSpecialty";

/// Persisted key holding the JSON-serialized selected professional.
pub const STORAGE_KEY_PROFESSIONAL: &str = "selectedBookingProfessional";

/// Persisted key holding the id of the category the seed was picked in.
pub const STORAGE_KEY_CATEGORY: &str = "selectedBookingCategory";

/// Query string of the booking page's entry point:
/// `?specialty=…&categoryId=…&professionalId=…&step=…`.
///
/// Values are kept as text so a malformed number drops only that field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedQuery {
    specialty: Option<String>,
    category_id: Option<String>,
    professional_id: Option<String>,
    step: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A typed pre-selection for the booking wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSeed {
    pub specialty: Option<String>,
    /// Category the professional was listed under, when known.
    pub category_id: Option<EntityId>,
    pub professional_id: Option<EntityId>,
    pub professional: Option<Professional>,
    pub step: Option<u8>,
}

impl BookingSeed {
    pub fn for_specialty(specialty: impl Into<String>) -> Self {
        Self {
            specialty: Some(specialty.into()),
            ..Self::default()
        }
    }

    pub fn for_professional(professional: Professional) -> Self {
        Self {
            professional_id: Some(professional.id),
            professional: Some(professional),
            ..Self::default()
        }
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn with_category(mut self, category_id: EntityId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_step(mut self, step: u8) -> Self {
        self.step = Some(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.specialty.is_none()
            && self.category_id.is_none()
            && self.professional_id.is_none()
            && self.professional.is_none()
    }

    /// Parse a URL query string (with or without a leading `?`).
    ///
    /// Unknown keys, blank values and unparsable numbers are ignored. A
    /// query that does not decode at all (a repeated key) gives an empty
    /// seed.
    pub fn from_query(query: &str) -> Self {
        let raw: SeedQuery =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_default();
        Self {
            specialty: non_blank(raw.specialty),
            category_id: non_blank(raw.category_id).and_then(|v| v.parse().ok()),
            professional_id: non_blank(raw.professional_id).and_then(|v| v.parse().ok()),
            professional: None,
            step: non_blank(raw.step).and_then(|v| v.parse().ok()),
        }
    }

    /// Persisted `(key, value)` entries for this seed.
    pub fn to_storage_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(specialty) = &self.specialty {
            entries.push((STORAGE_KEY_SPECIALTY, specialty.clone()));
        }
        if let Some(category_id) = self.category_id {
            entries.push((STORAGE_KEY_CATEGORY, category_id.to_string()));
        }
        if let Some(professional) = &self.professional {
            if let Ok(json) = serde_json::to_string(professional) {
                entries.push((STORAGE_KEY_PROFESSIONAL, json));
            }
        }
        entries
    }

    /// Rebuild a seed from persisted entries. A malformed professional
    /// entry is ignored.
    pub fn from_storage_entries<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let specialty = get(STORAGE_KEY_SPECIALTY).filter(|s| !s.trim().is_empty());
        let category_id = get(STORAGE_KEY_CATEGORY).and_then(|raw| raw.trim().parse().ok());
        let professional: Option<Professional> = get(STORAGE_KEY_PROFESSIONAL)
            .and_then(|raw| serde_json::from_str(&raw).ok());
        Self {
            specialty,
            category_id,
            professional_id: professional.as_ref().map(|p| p.id),
            professional,
            step: None,
        }
    }

    /// Find the category this seed points at.
    ///
    /// The category id wins when it is in the list. Otherwise the
    /// specialty, then the professional's specialties, are tried against
    /// category names (exact, then partial, accent- and case-insensitive).
    pub fn match_category<'a>(&self, categories: &'a [Category]) -> Option<&'a Category> {
        if let Some(cat) = self
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
        {
            return Some(cat);
        }

        let mut candidates: Vec<&str> = Vec::new();
        if let Some(specialty) = self.specialty.as_deref() {
            candidates.push(specialty);
        }
        if let Some(professional) = &self.professional {
            candidates.extend(professional.specialties.iter().map(String::as_str));
        }

        for candidate in &candidates {
            if let Some(cat) = categories.iter().find(|c| text::eq_folded(&c.name, candidate)) {
                return Some(cat);
            }
        }
        for candidate in &candidates {
            let needle = text::normalize(candidate);
            if needle.is_empty() {
                continue;
            }
            if let Some(cat) = categories.iter().find(|c| {
                let name = text::normalize(&c.name);
                name.contains(&needle) || needle.contains(&name)
            }) {
                return Some(cat);
            }
        }
        None
    }

    /// Resolve the seeded professional within a fetched list. A
    /// professional the list does not offer is not matched.
    pub fn match_professional<'a>(
        &self,
        professionals: &'a [Professional],
    ) -> Option<&'a Professional> {
        let id = self
            .professional_id
            .or_else(|| self.professional.as_ref().map(|p| p.id))?;
        professionals.iter().find(|p| p.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
