//! Booking wizard state machine.
//!
//! The wizard walks through five steps:
//!
//! 1. select a category,
//! 2. select a professional of that category,
//! 3. select one of the professional's open slots,
//! 4. enter the reason (motif),
//! 5. confirm.
//!
//! Forward transitions store the selection and move one step ahead.
//! [`BookingWorkflow::back`] moves one step back and drops the selection
//! that led into the step being left. A successful confirmation discards
//! the draft and returns to step 1; there is no separate "done" state.
//!
//! The workflow performs no I/O. Transitions that need data for the next
//! step return a [`FetchRequest`] for the caller to execute.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{Availability, BookingRequest, BookingStatus, Category, Professional};
use crate::motif::validate_motif;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The five steps of the booking wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    SelectCategory,
    SelectProfessional,
    SelectAvailability,
    EnterMotif,
    Confirm,
}

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 5;

impl BookingStep {
    /// Convert a 1-based step number to a `BookingStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::SelectCategory),
            2 => Ok(Self::SelectProfessional),
            3 => Ok(Self::SelectAvailability),
            4 => Ok(Self::EnterMotif),
            5 => Ok(Self::Confirm),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::SelectCategory => 1,
            Self::SelectProfessional => 2,
            Self::SelectAvailability => 3,
            Self::EnterMotif => 4,
            Self::Confirm => 5,
        }
    }

    /// Label shown in the wizard header.
    pub fn label(self) -> &'static str {
        match self {
            Self::SelectCategory => "Choisissez un domaine",
            Self::SelectProfessional => "Choisissez un professionnel",
            Self::SelectAvailability => "Choisissez un créneau",
            Self::EnterMotif => "Motif du rendez-vous",
            Self::Confirm => "Confirmation",
        }
    }

    /// The step before this one, if any.
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::SelectCategory => None,
            Self::SelectProfessional => Some(Self::SelectCategory),
            Self::SelectAvailability => Some(Self::SelectProfessional),
            Self::EnterMotif => Some(Self::SelectAvailability),
            Self::Confirm => Some(Self::EnterMotif),
        }
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// The in-progress booking accumulated across the wizard steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub category: Option<Category>,
    pub professional: Option<Professional>,
    pub availability: Option<Availability>,
    pub motif: Option<String>,
}

impl BookingDraft {
    /// `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.professional.is_none()
            && self.availability.is_none()
            && self.motif.is_none()
    }

    /// Assemble the submission payload.
    ///
    /// Fails unless all four fields are set and the motif is non-empty
    /// after trimming.
    pub fn to_request(&self) -> Result<BookingRequest, CoreError> {
        if self.category.is_none() {
            return Err(CoreError::Validation("No category selected".to_string()));
        }
        let professional = self
            .professional
            .as_ref()
            .ok_or_else(|| CoreError::Validation("No professional selected".to_string()))?;
        let availability = self
            .availability
            .as_ref()
            .ok_or_else(|| CoreError::Validation("No time slot selected".to_string()))?;
        let motif = validate_motif(self.motif.as_deref().unwrap_or_default())?;

        Ok(BookingRequest {
            professional_id: professional.id,
            date: availability.start,
            motif,
            status: BookingStatus::Pending,
        })
    }
}

// ---------------------------------------------------------------------------
// Side effects
// ---------------------------------------------------------------------------

/// Data the caller must load after a forward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
    /// `GET /categories/{category_id}/professionnels`
    Professionals { category_id: EntityId },
    /// `GET /professionnels/{professional_id}/disponibilites`
    Availabilities { professional_id: EntityId },
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// The booking wizard state machine.
///
/// Every operation invoked in the wrong step returns
/// [`CoreError::InvalidTransition`] and leaves the workflow untouched.
#[derive(Debug, Clone)]
pub struct BookingWorkflow {
    step: BookingStep,
    draft: BookingDraft,
    pending: Option<BookingRequest>,
}

impl Default for BookingWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWorkflow {
    pub fn new() -> Self {
        Self {
            step: BookingStep::SelectCategory,
            draft: BookingDraft::default(),
            pending: None,
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    /// The request assembled when the motif was accepted. Only set in
    /// [`BookingStep::Confirm`].
    pub fn pending_request(&self) -> Option<&BookingRequest> {
        self.pending.as_ref()
    }

    fn expect_step(&self, expected: BookingStep, action: &str) -> Result<(), CoreError> {
        if self.step != expected {
            return Err(CoreError::InvalidTransition(format!(
                "Cannot {action} on step {} ({}); expected step {}",
                self.step.to_number(),
                self.step.label(),
                expected.to_number()
            )));
        }
        Ok(())
    }

    /// Step 1 → 2.
    pub fn select_category(&mut self, category: Category) -> Result<FetchRequest, CoreError> {
        self.expect_step(BookingStep::SelectCategory, "select a category")?;
        let category_id = category.id;
        self.draft.category = Some(category);
        self.step = BookingStep::SelectProfessional;
        Ok(FetchRequest::Professionals { category_id })
    }

    /// Step 2 → 3.
    pub fn select_professional(
        &mut self,
        professional: Professional,
    ) -> Result<FetchRequest, CoreError> {
        self.expect_step(BookingStep::SelectProfessional, "select a professional")?;
        let professional_id = professional.id;
        self.draft.professional = Some(professional);
        self.step = BookingStep::SelectAvailability;
        Ok(FetchRequest::Availabilities { professional_id })
    }

    /// Step 3 → 4.
    pub fn select_availability(&mut self, slot: Availability) -> Result<(), CoreError> {
        self.expect_step(BookingStep::SelectAvailability, "select a time slot")?;
        self.draft.availability = Some(slot);
        self.step = BookingStep::EnterMotif;
        Ok(())
    }

    /// Step 4 → 5. Rejects an empty motif without changing state.
    pub fn submit_motif(&mut self, text: &str) -> Result<&BookingRequest, CoreError> {
        self.expect_step(BookingStep::EnterMotif, "enter a motif")?;
        let motif = validate_motif(text)?;

        let mut candidate = self.draft.clone();
        candidate.motif = Some(motif);
        let request = candidate.to_request()?;

        self.draft = candidate;
        self.step = BookingStep::Confirm;
        Ok(self.pending.insert(request))
    }

    /// The request to submit from the confirmation step.
    pub fn confirmation_request(&self) -> Result<BookingRequest, CoreError> {
        self.expect_step(BookingStep::Confirm, "confirm")?;
        // The submitted payload always reflects the current draft.
        let request = self.draft.to_request()?;
        debug_assert_eq!(self.pending.as_ref(), Some(&request));
        Ok(request)
    }

    /// Step 5 → 1 after the backend accepted the booking.
    pub fn submission_succeeded(&mut self) -> Result<(), CoreError> {
        self.expect_step(BookingStep::Confirm, "complete a submission")?;
        self.reset();
        Ok(())
    }

    /// Stay on step 5 with the draft intact so the user can retry.
    pub fn submission_failed(&mut self) -> Result<(), CoreError> {
        self.expect_step(BookingStep::Confirm, "record a failed submission")
    }

    /// Move one step back, dropping the selection that led into the
    /// current step. Returns the new step.
    pub fn back(&mut self) -> Result<BookingStep, CoreError> {
        let previous = self.step.previous().ok_or_else(|| {
            CoreError::InvalidTransition("Cannot go back from the first step".to_string())
        })?;

        match self.step {
            BookingStep::SelectCategory => {}
            BookingStep::SelectProfessional => self.draft.category = None,
            BookingStep::SelectAvailability => self.draft.professional = None,
            BookingStep::EnterMotif => self.draft.availability = None,
            BookingStep::Confirm => {
                self.draft.motif = None;
                self.pending = None;
            }
        }

        self.step = previous;
        Ok(previous)
    }

    /// Discard the draft and return to step 1.
    pub fn reset(&mut self) {
        self.step = BookingStep::SelectCategory;
        self.draft = BookingDraft::default();
        self.pending = None;
    }

    /// Restart the wizard from a pre-selection, skipping earlier steps.
    ///
    /// `max_step` caps how far the seed may advance (1..=3). Returns the
    /// fetch needed by the landing step, if any.
    pub fn seed(
        &mut self,
        category: Option<Category>,
        professional: Option<Professional>,
        max_step: Option<u8>,
    ) -> Result<Option<FetchRequest>, CoreError> {
        let cap = match max_step {
            Some(n) => BookingStep::from_number(n)?.to_number().min(3),
            None => 3,
        };

        self.reset();
        let mut fetch = None;

        if let Some(category) = category {
            if cap >= 2 {
                fetch = Some(self.select_category(category)?);
                if let Some(professional) = professional {
                    if cap >= 3 {
                        fetch = Some(self.select_professional(professional)?);
                    }
                }
            }
        }

        Ok(fetch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn informatique() -> Category {
        Category {
            id: 1,
            name: "Informatique".into(),
            description: Some("Dépannage et conseil".into()),
        }
    }

    fn jean() -> Professional {
        Professional {
            id: 42,
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            photo: None,
            tariff: Some(50.0),
            specialties: vec!["Réseaux".into()],
            description: None,
        }
    }

    fn slot() -> Availability {
        Availability {
            id: 9,
            start: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap(),
        }
    }

    fn at_confirm() -> BookingWorkflow {
        let mut wf = BookingWorkflow::new();
        wf.select_category(informatique()).unwrap();
        wf.select_professional(jean()).unwrap();
        wf.select_availability(slot()).unwrap();
        wf.submit_motif("Révision système").unwrap();
        wf
    }

    // -- BookingStep --

    #[test]
    fn step_number_roundtrip() {
        for n in MIN_STEP..=MAX_STEP {
            assert_eq!(BookingStep::from_number(n).unwrap().to_number(), n);
        }
        assert!(BookingStep::from_number(0).is_err());
        assert!(BookingStep::from_number(6).is_err());
    }

    #[test]
    fn first_step_has_no_previous() {
        assert_eq!(BookingStep::SelectCategory.previous(), None);
        assert_eq!(
            BookingStep::Confirm.previous(),
            Some(BookingStep::EnterMotif)
        );
    }

    // -- Forward transitions --

    #[test]
    fn starts_on_step_one_with_empty_draft() {
        let wf = BookingWorkflow::new();
        assert_eq!(wf.step(), BookingStep::SelectCategory);
        assert!(wf.draft().is_empty());
        assert!(wf.pending_request().is_none());
    }

    #[test]
    fn forward_transitions_request_fetches() {
        let mut wf = BookingWorkflow::new();
        assert_eq!(
            wf.select_category(informatique()).unwrap(),
            FetchRequest::Professionals { category_id: 1 }
        );
        assert_eq!(
            wf.select_professional(jean()).unwrap(),
            FetchRequest::Availabilities { professional_id: 42 }
        );
        wf.select_availability(slot()).unwrap();
        assert_eq!(wf.step(), BookingStep::EnterMotif);
    }

    #[test]
    fn full_traversal_builds_expected_payload() {
        let wf = at_confirm();
        assert_eq!(wf.step(), BookingStep::Confirm);
        let request = wf.confirmation_request().unwrap();
        assert_eq!(request.date, slot().start);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "professionnelId": 42,
                "date": "2024-06-10T09:00:00.000Z",
                "motif": "Révision système",
                "status": "PENDING"
            })
        );
    }

    #[test]
    fn wrong_step_operations_are_rejected_without_change() {
        let mut wf = BookingWorkflow::new();
        assert_matches!(
            wf.select_professional(jean()),
            Err(CoreError::InvalidTransition(_))
        );
        assert_matches!(
            wf.select_availability(slot()),
            Err(CoreError::InvalidTransition(_))
        );
        assert_matches!(wf.submit_motif("x"), Err(CoreError::InvalidTransition(_)));
        assert_matches!(wf.confirmation_request(), Err(CoreError::InvalidTransition(_)));
        assert_matches!(wf.submission_succeeded(), Err(CoreError::InvalidTransition(_)));
        assert_eq!(wf.step(), BookingStep::SelectCategory);
        assert!(wf.draft().is_empty());
    }

    // -- Motif --

    #[test]
    fn blank_motif_is_rejected_and_state_kept() {
        let mut wf = BookingWorkflow::new();
        wf.select_category(informatique()).unwrap();
        wf.select_professional(jean()).unwrap();
        wf.select_availability(slot()).unwrap();

        for blank in ["", "   ", "\n\t"] {
            assert_matches!(wf.submit_motif(blank), Err(CoreError::Validation(_)));
            assert_eq!(wf.step(), BookingStep::EnterMotif);
            assert!(wf.draft().motif.is_none());
            assert!(wf.pending_request().is_none());
        }
    }

    #[test]
    fn motif_is_stored_trimmed() {
        let mut wf = BookingWorkflow::new();
        wf.select_category(informatique()).unwrap();
        wf.select_professional(jean()).unwrap();
        wf.select_availability(slot()).unwrap();
        let request = wf.submit_motif("  Écran cassé  ").unwrap();
        assert_eq!(request.motif, "Écran cassé");
        assert_eq!(wf.draft().motif.as_deref(), Some("Écran cassé"));
    }

    // -- Confirmation --

    #[test]
    fn success_resets_everything() {
        let mut wf = at_confirm();
        wf.submission_succeeded().unwrap();
        assert_eq!(wf.step(), BookingStep::SelectCategory);
        assert!(wf.draft().is_empty());
        assert!(wf.pending_request().is_none());
    }

    #[test]
    fn failure_preserves_draft_on_confirm() {
        let mut wf = at_confirm();
        let before = wf.draft().clone();
        wf.submission_failed().unwrap();
        assert_eq!(wf.step(), BookingStep::Confirm);
        assert_eq!(wf.draft(), &before);
        assert!(wf.confirmation_request().is_ok());
    }

    // -- Back navigation --

    #[test]
    fn back_from_first_step_is_rejected() {
        let mut wf = BookingWorkflow::new();
        assert_matches!(wf.back(), Err(CoreError::InvalidTransition(_)));
    }

    #[test]
    fn back_clears_only_the_selection_leading_into_the_left_step() {
        let mut wf = at_confirm();

        assert_eq!(wf.back().unwrap(), BookingStep::EnterMotif);
        assert!(wf.draft().motif.is_none());
        assert!(wf.pending_request().is_none());
        assert!(wf.draft().availability.is_some());
        assert!(wf.draft().professional.is_some());
        assert!(wf.draft().category.is_some());

        assert_eq!(wf.back().unwrap(), BookingStep::SelectAvailability);
        assert!(wf.draft().availability.is_none());
        assert!(wf.draft().professional.is_some());
        assert!(wf.draft().category.is_some());

        assert_eq!(wf.back().unwrap(), BookingStep::SelectProfessional);
        assert!(wf.draft().professional.is_none());
        assert!(wf.draft().category.is_some());

        assert_eq!(wf.back().unwrap(), BookingStep::SelectCategory);
        assert!(wf.draft().is_empty());
    }

    #[test]
    fn reselection_after_back_replaces_previous_choice() {
        let mut wf = BookingWorkflow::new();
        wf.select_category(informatique()).unwrap();
        wf.select_professional(jean()).unwrap();
        wf.back().unwrap();

        let mut marie = jean();
        marie.id = 43;
        marie.first_name = "Marie".into();
        assert_eq!(
            wf.select_professional(marie).unwrap(),
            FetchRequest::Availabilities { professional_id: 43 }
        );
        assert_eq!(wf.draft().professional.as_ref().unwrap().id, 43);
    }

    // -- Seeding --

    #[test]
    fn seed_with_category_lands_on_step_two() {
        let mut wf = at_confirm();
        let fetch = wf.seed(Some(informatique()), None, None).unwrap();
        assert_eq!(fetch, Some(FetchRequest::Professionals { category_id: 1 }));
        assert_eq!(wf.step(), BookingStep::SelectProfessional);
        assert!(wf.draft().professional.is_none());
    }

    #[test]
    fn seed_with_professional_lands_on_step_three() {
        let mut wf = BookingWorkflow::new();
        let fetch = wf.seed(Some(informatique()), Some(jean()), None).unwrap();
        assert_eq!(fetch, Some(FetchRequest::Availabilities { professional_id: 42 }));
        assert_eq!(wf.step(), BookingStep::SelectAvailability);
    }

    #[test]
    fn seed_respects_step_cap() {
        let mut wf = BookingWorkflow::new();
        let fetch = wf.seed(Some(informatique()), Some(jean()), Some(2)).unwrap();
        assert_eq!(fetch, Some(FetchRequest::Professionals { category_id: 1 }));
        assert_eq!(wf.step(), BookingStep::SelectProfessional);

        let fetch = wf.seed(Some(informatique()), Some(jean()), Some(1)).unwrap();
        assert_eq!(fetch, None);
        assert_eq!(wf.step(), BookingStep::SelectCategory);
        assert!(wf.draft().is_empty());
    }

    #[test]
    fn seed_rejects_invalid_step_number() {
        let mut wf = BookingWorkflow::new();
        assert!(wf.seed(Some(informatique()), None, Some(9)).is_err());
    }

    #[test]
    fn draft_to_request_requires_all_fields() {
        let mut draft = BookingDraft::default();
        assert!(draft.to_request().is_err());
        draft.category = Some(informatique());
        draft.professional = Some(jean());
        draft.availability = Some(slot());
        assert!(draft.to_request().is_err());
        draft.motif = Some("  ".into());
        assert!(draft.to_request().is_err());
        draft.motif = Some("ok".into());
        assert!(draft.to_request().is_ok());
    }
}
