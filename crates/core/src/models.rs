//! Entities exchanged with the booking backend.
//!
//! The backend speaks French field names (`nom`, `prenom`, `tarif`, ...)
//! on some endpoints and camelCase English on others, so every struct
//! accepts both through serde aliases and serializes the camelCase form.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Catalog entities
// ---------------------------------------------------------------------------

/// A bookable domain (e.g. "Informatique", "Santé").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A professional offering slots within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: EntityId,
    #[serde(alias = "prenom")]
    pub first_name: String,
    #[serde(alias = "nom")]
    pub last_name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default, alias = "tarif")]
    pub tariff: Option<f64>,
    #[serde(default, alias = "specialites")]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Professional {
    /// "First Last", trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// The photo URL, or `default` when the photo is missing or blank.
    pub fn avatar_url<'a>(&'a self, default: &'a str) -> &'a str {
        match self.photo.as_deref().map(str::trim) {
            Some(photo) if !photo.is_empty() => photo,
            _ => default,
        }
    }
}

/// An open time slot offered by one professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: EntityId,
    #[serde(alias = "dateDebut", with = "timestamp_format")]
    pub start: Timestamp,
    #[serde(alias = "dateFin", with = "timestamp_format")]
    pub end: Timestamp,
}

// ---------------------------------------------------------------------------
// Booking status
// ---------------------------------------------------------------------------

/// Lifecycle status of a booking as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Parse the backend's status string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid booking status '{s}'. Must be one of: PENDING, CONFIRMED, CANCELLED, COMPLETED"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    /// French label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Confirmed => "Confirmé",
            Self::Cancelled => "Annulé",
            Self::Completed => "Terminé",
        }
    }
}

// ---------------------------------------------------------------------------
// Booking payloads
// ---------------------------------------------------------------------------

/// The payload submitted to `POST /utilisateurs/rendez-vous`.
///
/// Only [`crate::booking_workflow::BookingWorkflow`] builds one, from a
/// fully populated draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(rename = "professionnelId")]
    pub professional_id: EntityId,
    /// ISO-8601 start of the chosen slot.
    #[serde(with = "timestamp_format")]
    pub date: Timestamp,
    pub motif: String,
    pub status: BookingStatus,
}

/// A booking as listed on the user dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: EntityId,
    #[serde(default, rename = "professionnelId", alias = "professionalId")]
    pub professional_id: Option<EntityId>,
    #[serde(default, alias = "professionnel")]
    pub professional: Option<Professional>,
    #[serde(with = "timestamp_format")]
    pub date: Timestamp,
    #[serde(default)]
    pub motif: String,
    pub status: BookingStatus,
}

// ---------------------------------------------------------------------------
// Timestamp wire format
// ---------------------------------------------------------------------------

/// Wire format for timestamps.
///
/// Serializes as `YYYY-MM-DDTHH:MM:SS.mmmZ`. Deserializes RFC 3339 with
/// any offset, or a naive `YYYY-MM-DDTHH:MM[:SS[.f]]` which the backend
/// emits for UTC values.
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::Timestamp;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    /// Render a timestamp the way the backend expects it.
    pub fn to_iso(ts: &Timestamp) -> String {
        ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    /// Parse a backend timestamp string.
    pub fn parse(raw: &str) -> Option<Timestamp> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_iso(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
