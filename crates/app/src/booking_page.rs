//! Booking page controller.
//!
//! Drives a [`BookingWorkflow`] against a [`BookingBackend`]. Catalog and
//! slot fetches run as spawned tasks; their results come back through an
//! internal channel and are applied by [`BookingPage::next_update`] (or
//! [`BookingPage::settle`]) only while their generation is still current
//! for the step. Leaving or re-entering a step cancels its in-flight fetch.
//!
//! The controller owns all page state: there is no shared mutable state
//! between the fetch tasks and the page.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{FixedOffset, Local, NaiveDate, Offset, Utc};
use rdv_core::availability::{
    format_date_key, format_date_label, group_by_date, slot_label, AvailabilityGroups, SlotPicker,
};
use rdv_core::booking_workflow::{BookingDraft, BookingStep, BookingWorkflow, FetchRequest};
use rdv_core::error::CoreError;
use rdv_core::fetch::{Generation, SelectionCache, StepFetch};
use rdv_core::handoff::BookingSeed;
use rdv_core::models::{timestamp_format, Availability, Booking, Category, Professional};
use rdv_core::types::{EntityId, Timestamp};
use rdv_events::bus::{BookingEvent, EventBus, BOOKING_CREATED};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::BookingBackend;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Zone in which slots are grouped by calendar date and labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotZone {
    /// The machine's zone. The offset is resolved per timestamp, so
    /// daylight saving time is honoured.
    Local,
    Fixed(FixedOffset),
}

impl SlotZone {
    pub fn group(&self, slots: &[Availability]) -> AvailabilityGroups {
        match self {
            Self::Local => group_by_date(slots, &Local),
            Self::Fixed(offset) => group_by_date(slots, offset),
        }
    }

    /// `HH:MM - HH:MM` label of `slot`.
    pub fn slot_label(&self, slot: &Availability) -> String {
        match self {
            Self::Local => slot_label(slot, &Local),
            Self::Fixed(offset) => slot_label(slot, offset),
        }
    }

    /// Calendar date of `ts`.
    pub fn date_of(&self, ts: &Timestamp) -> NaiveDate {
        match self {
            Self::Local => ts.with_timezone(&Local).date_naive(),
            Self::Fixed(offset) => ts.with_timezone(offset).date_naive(),
        }
    }

    /// `ts` rendered with a `strftime` pattern.
    pub fn format(&self, ts: &Timestamp, pattern: &str) -> String {
        match self {
            Self::Local => ts.with_timezone(&Local).format(pattern).to_string(),
            Self::Fixed(offset) => ts.with_timezone(offset).format(pattern).to_string(),
        }
    }
}

/// Presentation settings of the booking page.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub tz: SlotZone,
    pub default_avatar_url: String,
}

impl PageOptions {
    /// Options using the machine's time zone.
    pub fn local(default_avatar_url: impl Into<String>) -> Self {
        Self {
            tz: SlotZone::Local,
            default_avatar_url: default_avatar_url.into(),
        }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            tz: SlotZone::Fixed(Utc.fix()),
            default_avatar_url: "/images/default-avatar.png".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// One selectable entry (category or slot).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub id: EntityId,
    pub label: String,
    pub detail: Option<String>,
}

/// A professional as shown on step 2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessionalCard {
    pub id: EntityId,
    pub name: String,
    pub avatar_url: String,
    pub tariff: Option<f64>,
    pub specialties: Vec<String>,
    pub description: Option<String>,
}

/// A date tab on step 3.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateTab {
    pub date: NaiveDate,
    /// `YYYY-MM-DD`.
    pub key: String,
    pub label: String,
    pub slot_count: usize,
    pub selected: bool,
}

/// Everything the front-end needs to render the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub step: BookingStep,
    pub step_number: u8,
    pub title: &'static str,
    pub loading: bool,
    /// Step-scoped fetch error, or the submission error on step 5.
    pub error: Option<String>,
    pub notice: Option<String>,
    pub categories: Vec<Choice>,
    pub professionals: Vec<ProfessionalCard>,
    pub dates: Vec<DateTab>,
    pub slots: Vec<Choice>,
    /// The professional has no open slot: only going back is possible.
    pub no_availability: bool,
    pub motif_error: Option<String>,
    /// `(label, value)` recap of the draft.
    pub summary: Vec<(String, String)>,
    pub can_go_back: bool,
}

// ---------------------------------------------------------------------------
// Fetch plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchKind {
    Categories,
    Professionals,
    Availabilities,
}

#[derive(Debug)]
enum FetchOutcome {
    Categories {
        ticket: Generation,
        result: Result<Vec<Category>, String>,
    },
    Professionals {
        category_id: EntityId,
        ticket: Generation,
        result: Result<Vec<Professional>, String>,
    },
    Availabilities {
        professional_id: EntityId,
        ticket: Generation,
        result: Result<Vec<Availability>, String>,
    },
}

fn to_message(error: rdv_client::ApiError) -> String {
    AppError::from(error).user_message()
}

/// Highest step a seed may advance the wizard to.
fn seed_cap(seed: &BookingSeed) -> u8 {
    seed.step.map(|n| n.clamp(1, 3)).unwrap_or(3)
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// The booking wizard page.
pub struct BookingPage {
    backend: Arc<dyn BookingBackend>,
    options: PageOptions,
    workflow: BookingWorkflow,

    categories: StepFetch<Vec<Category>>,
    professionals: StepFetch<Vec<Professional>>,
    availabilities: StepFetch<Vec<Availability>>,
    picker: Option<SlotPicker>,
    professional_cache: SelectionCache<EntityId, Vec<Professional>>,
    availability_cache: SelectionCache<EntityId, Vec<Availability>>,

    in_flight: HashMap<FetchKind, CancellationToken>,
    shutdown: CancellationToken,
    updates_tx: mpsc::UnboundedSender<FetchOutcome>,
    updates_rx: mpsc::UnboundedReceiver<FetchOutcome>,

    pending_seed: Option<BookingSeed>,
    motif_error: Option<String>,
    submit_error: Option<String>,
    notice: Option<String>,
    last_booking: Option<Booking>,
    events: Option<Arc<EventBus>>,
}

impl BookingPage {
    pub fn new(backend: Arc<dyn BookingBackend>, options: PageOptions) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            options,
            workflow: BookingWorkflow::new(),
            categories: StepFetch::new(),
            professionals: StepFetch::new(),
            availabilities: StepFetch::new(),
            picker: None,
            professional_cache: SelectionCache::new(),
            availability_cache: SelectionCache::new(),
            in_flight: HashMap::new(),
            shutdown: CancellationToken::new(),
            updates_tx,
            updates_rx,
            pending_seed: None,
            motif_error: None,
            submit_error: None,
            notice: None,
            last_booking: None,
            events: None,
        }
    }

    /// Publish booking events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn step(&self) -> BookingStep {
        self.workflow.step()
    }

    pub fn draft(&self) -> &BookingDraft {
        self.workflow.draft()
    }

    /// Whether any step still waits for a fetch result.
    pub fn is_loading(&self) -> bool {
        self.categories.is_loading()
            || self.professionals.is_loading()
            || self.availabilities.is_loading()
    }

    /// The loaded category list, if any.
    pub fn categories(&self) -> &[Category] {
        self.categories.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// The booking returned by the last successful submission.
    pub fn last_booking(&self) -> Option<&Booking> {
        self.last_booking.as_ref()
    }

    // ---- loading ----

    /// Fetch the category list for step 1.
    pub fn load_categories(&mut self) {
        let ticket = self.categories.begin();
        let backend = Arc::clone(&self.backend);
        tracing::debug!(generation = ticket.value(), "Loading categories");
        self.spawn_fetch(FetchKind::Categories, async move {
            FetchOutcome::Categories {
                ticket,
                result: backend.categories().await.map_err(to_message),
            }
        });
    }

    fn load_professionals(&mut self, category_id: EntityId) {
        if let Some(cached) = self.professional_cache.get(&category_id) {
            let cached = cached.clone();
            self.cancel(FetchKind::Professionals);
            self.professionals.fill(cached);
            tracing::debug!(category_id, "Professionals served from cache");
            return;
        }
        let ticket = self.professionals.begin();
        let backend = Arc::clone(&self.backend);
        tracing::debug!(category_id, generation = ticket.value(), "Loading professionals");
        self.spawn_fetch(FetchKind::Professionals, async move {
            FetchOutcome::Professionals {
                category_id,
                ticket,
                result: backend.professionals(category_id).await.map_err(to_message),
            }
        });
    }

    fn load_availabilities(&mut self, professional_id: EntityId) {
        self.picker = None;
        if let Some(cached) = self.availability_cache.get(&professional_id) {
            let cached = cached.clone();
            self.cancel(FetchKind::Availabilities);
            self.availabilities.fill(cached);
            self.rebuild_picker();
            tracing::debug!(professional_id, "Availabilities served from cache");
            return;
        }
        let ticket = self.availabilities.begin();
        let backend = Arc::clone(&self.backend);
        tracing::debug!(professional_id, generation = ticket.value(), "Loading availabilities");
        self.spawn_fetch(FetchKind::Availabilities, async move {
            FetchOutcome::Availabilities {
                professional_id,
                ticket,
                result: backend
                    .availabilities(professional_id)
                    .await
                    .map_err(to_message),
            }
        });
    }

    fn execute(&mut self, request: FetchRequest) {
        match request {
            FetchRequest::Professionals { category_id } => self.load_professionals(category_id),
            FetchRequest::Availabilities { professional_id } => {
                self.load_availabilities(professional_id)
            }
        }
    }

    /// Run `fetch` on the runtime, replacing (and cancelling) the previous
    /// fetch of the same kind.
    fn spawn_fetch<F>(&mut self, kind: FetchKind, fetch: F)
    where
        F: Future<Output = FetchOutcome> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        if let Some(previous) = self.in_flight.insert(kind, token.clone()) {
            previous.cancel();
        }
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(?kind, "Fetch cancelled");
                }
                outcome = fetch => {
                    // The page may already be gone.
                    let _ = tx.send(outcome);
                }
            }
        });
    }

    fn cancel(&mut self, kind: FetchKind) {
        if let Some(token) = self.in_flight.remove(&kind) {
            token.cancel();
        }
    }

    fn rebuild_picker(&mut self) {
        self.picker = self
            .availabilities
            .data()
            .map(|slots| SlotPicker::new(self.options.tz.group(slots)));
    }

    /// Drop professionals and slots (categories are kept).
    fn clear_step_data(&mut self) {
        self.cancel(FetchKind::Professionals);
        self.cancel(FetchKind::Availabilities);
        self.professionals.reset();
        self.availabilities.reset();
        self.picker = None;
    }

    // ---- fetch results ----

    /// Wait for one fetch result and apply it.
    ///
    /// Returns `false` immediately when nothing is loading.
    pub async fn next_update(&mut self) -> bool {
        if !self.is_loading() {
            return false;
        }
        match self.updates_rx.recv().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    /// Apply fetch results until no step is loading.
    pub async fn settle(&mut self) {
        while self.next_update().await {}
    }

    fn apply(&mut self, outcome: FetchOutcome) -> bool {
        let applied = match outcome {
            FetchOutcome::Categories { ticket, result } => {
                let applied = self.categories.resolve(ticket, result);
                if applied {
                    self.in_flight.remove(&FetchKind::Categories);
                }
                applied
            }
            FetchOutcome::Professionals {
                category_id,
                ticket,
                result,
            } => {
                let fresh = result.as_ref().ok().cloned();
                let applied = self.professionals.resolve(ticket, result);
                if applied {
                    self.in_flight.remove(&FetchKind::Professionals);
                    if let Some(list) = fresh {
                        self.professional_cache.insert(category_id, list);
                    }
                }
                applied
            }
            FetchOutcome::Availabilities {
                professional_id,
                ticket,
                result,
            } => {
                let fresh = result.as_ref().ok().cloned();
                let applied = self.availabilities.resolve(ticket, result);
                if applied {
                    self.in_flight.remove(&FetchKind::Availabilities);
                    if let Some(slots) = fresh {
                        self.availability_cache.insert(professional_id, slots);
                    }
                    self.rebuild_picker();
                }
                applied
            }
        };

        if applied {
            self.advance_seed();
        } else {
            tracing::debug!("Discarded superseded fetch result");
        }
        applied
    }

    // ---- user actions ----

    /// Step 1: pick a category by id.
    pub fn choose_category(&mut self, category_id: EntityId) -> AppResult<()> {
        let category = self
            .categories
            .data()
            .and_then(|list| list.iter().find(|c| c.id == category_id))
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "category",
                id: category_id,
            })?;
        let fetch = self.workflow.select_category(category)?;
        tracing::info!(category_id, "Category selected");
        self.notice = None;
        self.pending_seed = None;
        self.execute(fetch);
        Ok(())
    }

    /// Step 2: pick a professional by id.
    pub fn choose_professional(&mut self, professional_id: EntityId) -> AppResult<()> {
        let professional = self
            .professionals
            .data()
            .and_then(|list| list.iter().find(|p| p.id == professional_id))
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "professional",
                id: professional_id,
            })?;
        let fetch = self.workflow.select_professional(professional)?;
        tracing::info!(professional_id, "Professional selected");
        self.notice = None;
        self.pending_seed = None;
        self.execute(fetch);
        Ok(())
    }

    /// Step 3: show the slots of another date.
    pub fn choose_date(&mut self, date: NaiveDate) -> AppResult<()> {
        if self.workflow.step() != BookingStep::SelectAvailability {
            return Err(CoreError::InvalidTransition(
                "Dates can only be chosen while selecting a time slot".to_string(),
            )
            .into());
        }
        let picker = self.picker.as_mut().ok_or_else(|| {
            CoreError::Validation("Les créneaux ne sont pas encore chargés.".to_string())
        })?;
        picker.select_date(date)?;
        Ok(())
    }

    /// Step 3: pick one of the visible slots by id.
    pub fn choose_slot(&mut self, slot_id: EntityId) -> AppResult<()> {
        let slot = self
            .picker
            .as_ref()
            .and_then(|picker| picker.find_visible(slot_id))
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "availability",
                id: slot_id,
            })?;
        self.workflow.select_availability(slot)?;
        tracing::info!(slot_id, "Time slot selected");
        Ok(())
    }

    /// Step 4: validate the motif. An empty motif sets an inline error and
    /// keeps the page on step 4.
    pub fn submit_motif(&mut self, text: &str) -> AppResult<()> {
        match self.workflow.submit_motif(text) {
            Ok(_) => {
                self.motif_error = None;
                self.submit_error = None;
                Ok(())
            }
            Err(e @ CoreError::Validation(_)) => {
                let err = AppError::from(e);
                self.motif_error = Some(err.user_message());
                Err(err)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Step 5: submit the booking.
    ///
    /// On success the draft is discarded, a `booking.created` event is
    /// published and the page returns to step 1. On failure the page stays
    /// on step 5 with the draft intact and the error is shown there.
    pub async fn confirm(&mut self) -> AppResult<Option<Booking>> {
        let request = self.workflow.confirmation_request()?;
        self.submit_error = None;
        tracing::info!(
            professional_id = request.professional_id,
            date = %timestamp_format::to_iso(&request.date),
            "Submitting booking"
        );

        match self.backend.create_booking(&request).await {
            Ok(created) => {
                self.workflow.submission_succeeded()?;
                self.availability_cache.invalidate(&request.professional_id);
                self.clear_step_data();
                self.pending_seed = None;
                self.motif_error = None;
                self.notice = Some("Votre rendez-vous a bien été enregistré.".to_string());

                if let Some(bus) = &self.events {
                    let mut event = BookingEvent::new(BOOKING_CREATED)
                        .with_professional(request.professional_id)
                        .with_payload(serde_json::json!({
                            "date": timestamp_format::to_iso(&request.date),
                            "motif": request.motif,
                        }));
                    if let Some(booking) = &created {
                        event = event.with_booking(booking.id);
                    }
                    bus.publish(event);
                }

                tracing::info!(
                    booking_id = ?created.as_ref().map(|b| b.id),
                    "Booking created"
                );
                self.last_booking = created.clone();
                Ok(created)
            }
            Err(e) => {
                self.workflow.submission_failed()?;
                // The slot may have been taken meanwhile.
                self.availability_cache.invalidate(&request.professional_id);
                let err = AppError::from(e);
                tracing::warn!(error = %err, "Booking submission failed");
                self.submit_error = Some(format!(
                    "La réservation a échoué : {}",
                    err.user_message()
                ));
                Err(err)
            }
        }
    }

    /// Go back one step, dropping the selection that led into the step
    /// being left and its loaded data.
    pub fn back(&mut self) -> AppResult<BookingStep> {
        let leaving = self.workflow.step();
        let leaving_professional = self.workflow.draft().professional.as_ref().map(|p| p.id);
        let step = self.workflow.back()?;
        match leaving {
            BookingStep::SelectProfessional => {
                self.cancel(FetchKind::Professionals);
                self.professionals.reset();
            }
            BookingStep::SelectAvailability => {
                self.cancel(FetchKind::Availabilities);
                self.availabilities.reset();
                self.picker = None;
                if let Some(professional_id) = leaving_professional {
                    self.availability_cache.invalidate(&professional_id);
                }
            }
            BookingStep::Confirm => self.submit_error = None,
            BookingStep::SelectCategory | BookingStep::EnterMotif => {}
        }
        self.motif_error = None;
        self.notice = None;
        self.pending_seed = None;
        tracing::debug!(from = leaving.to_number(), to = step.to_number(), "Went back");
        Ok(step)
    }

    /// Re-issue the fetch of the current step after an error.
    pub fn retry(&mut self) -> AppResult<()> {
        match self.workflow.step() {
            BookingStep::SelectCategory => self.load_categories(),
            BookingStep::SelectProfessional => {
                let category_id = self
                    .workflow
                    .draft()
                    .category
                    .as_ref()
                    .map(|c| c.id)
                    .ok_or_else(|| CoreError::Internal("Step 2 without a category".into()))?;
                self.professional_cache.invalidate(&category_id);
                self.load_professionals(category_id);
            }
            BookingStep::SelectAvailability => {
                let professional_id = self
                    .workflow
                    .draft()
                    .professional
                    .as_ref()
                    .map(|p| p.id)
                    .ok_or_else(|| CoreError::Internal("Step 3 without a professional".into()))?;
                self.availability_cache.invalidate(&professional_id);
                self.load_availabilities(professional_id);
            }
            BookingStep::EnterMotif | BookingStep::Confirm => {
                return Err(CoreError::InvalidTransition(
                    "Nothing to reload on this step".to_string(),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Discard the draft and start over from step 1.
    pub fn restart(&mut self) {
        self.workflow.reset();
        self.clear_step_data();
        self.pending_seed = None;
        self.motif_error = None;
        self.submit_error = None;
        if self.categories.data().is_none() && !self.categories.is_loading() {
            self.load_categories();
        }
    }

    // ---- seeds ----

    /// Restart the wizard from a pre-selection.
    ///
    /// A specialty selects the matching category (step 2); a professional
    /// also selects that professional (step 3). The seed's `step` caps how
    /// far it advances. Whatever is not loaded yet is applied as soon as
    /// the data arrives.
    pub fn apply_seed(&mut self, seed: BookingSeed) {
        if seed.is_empty() {
            return;
        }
        tracing::info!(
            specialty = ?seed.specialty,
            professional_id = ?seed.professional_id,
            step = ?seed.step,
            "Applying booking seed"
        );
        self.restart();
        self.notice = None;
        self.pending_seed = Some(seed);
        self.advance_seed();
    }

    fn advance_seed(&mut self) {
        let Some(seed) = self.pending_seed.clone() else {
            return;
        };
        let cap = seed_cap(&seed);

        match self.workflow.step() {
            BookingStep::SelectCategory => {
                if cap < 2 {
                    self.pending_seed = None;
                    return;
                }
                let Some(categories) = self.categories.data() else {
                    return;
                };
                let Some(category) = seed.match_category(categories).cloned() else {
                    tracing::info!(specialty = ?seed.specialty, "Seed matches no category");
                    self.notice = Some(match seed.specialty.as_deref() {
                        Some(s) => format!("Aucun domaine ne correspond à « {s} »."),
                        None => "Ce professionnel n'est rattaché à aucun domaine.".to_string(),
                    });
                    self.pending_seed = None;
                    return;
                };

                let category_id = category.id;
                match self.workflow.seed(Some(category), None, Some(cap.min(2))) {
                    Ok(_) => {
                        self.load_professionals(category_id);
                        if cap < 3 || seed.professional_id.is_none() {
                            self.pending_seed = None;
                        } else {
                            // The professional must belong to the fetched list.
                            self.advance_seed();
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Seed could not be applied");
                        self.pending_seed = None;
                    }
                }
            }
            BookingStep::SelectProfessional => {
                let Some(professionals) = self.professionals.data() else {
                    return;
                };
                let found = seed.match_professional(professionals).cloned();
                self.pending_seed = None;
                match found {
                    Some(professional) => match self.workflow.select_professional(professional) {
                        Ok(fetch) => self.execute(fetch),
                        Err(e) => tracing::warn!(error = %e, "Seeded professional rejected"),
                    },
                    None => {
                        tracing::info!(professional_id = ?seed.professional_id, "Seeded professional not found");
                        self.notice =
                            Some("Ce professionnel n'est pas proposé dans ce domaine.".to_string());
                    }
                }
            }
            _ => self.pending_seed = None,
        }
    }

    // ---- rendering ----

    /// Describe what to render for the current step.
    pub fn view(&self) -> PageView {
        let step = self.workflow.step();
        let mut view = PageView {
            step,
            step_number: step.to_number(),
            title: step.label(),
            loading: false,
            error: None,
            notice: self.notice.clone(),
            categories: Vec::new(),
            professionals: Vec::new(),
            dates: Vec::new(),
            slots: Vec::new(),
            no_availability: false,
            motif_error: None,
            summary: self.summary(),
            can_go_back: step.previous().is_some(),
        };

        match step {
            BookingStep::SelectCategory => {
                view.loading = self.categories.is_loading();
                view.error = self.categories.error().map(str::to_string);
                view.categories = self
                    .categories
                    .data()
                    .map(|list| {
                        list.iter()
                            .map(|c| Choice {
                                id: c.id,
                                label: c.name.clone(),
                                detail: c.description.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
            }
            BookingStep::SelectProfessional => {
                view.loading = self.professionals.is_loading();
                view.error = self.professionals.error().map(str::to_string);
                view.professionals = self
                    .professionals
                    .data()
                    .map(|list| list.iter().map(|p| self.card(p)).collect())
                    .unwrap_or_default();
            }
            BookingStep::SelectAvailability => {
                view.loading = self.availabilities.is_loading();
                view.error = self.availabilities.error().map(str::to_string);
                if let Some(picker) = &self.picker {
                    let selected = picker.selected_date();
                    view.dates = picker
                        .groups()
                        .iter()
                        .map(|(date, slots)| DateTab {
                            date,
                            key: format_date_key(date),
                            label: format_date_label(date),
                            slot_count: slots.len(),
                            selected: Some(date) == selected,
                        })
                        .collect();
                    view.slots = picker
                        .visible_slots()
                        .iter()
                        .map(|slot| Choice {
                            id: slot.id,
                            label: self.options.tz.slot_label(slot),
                            detail: None,
                        })
                        .collect();
                    view.no_availability = picker.groups().is_empty();
                }
            }
            BookingStep::EnterMotif => view.motif_error = self.motif_error.clone(),
            BookingStep::Confirm => view.error = self.submit_error.clone(),
        }
        view
    }

    fn card(&self, professional: &Professional) -> ProfessionalCard {
        ProfessionalCard {
            id: professional.id,
            name: professional.display_name(),
            avatar_url: professional
                .avatar_url(&self.options.default_avatar_url)
                .to_string(),
            tariff: professional.tariff,
            specialties: professional.specialties.clone(),
            description: professional.description.clone(),
        }
    }

    fn summary(&self) -> Vec<(String, String)> {
        let draft = self.workflow.draft();
        let mut lines = Vec::new();
        if let Some(category) = &draft.category {
            lines.push(("Domaine".to_string(), category.name.clone()));
        }
        if let Some(professional) = &draft.professional {
            lines.push(("Professionnel".to_string(), professional.display_name()));
        }
        if let Some(slot) = &draft.availability {
            let date = self.options.tz.date_of(&slot.start);
            lines.push((
                "Créneau".to_string(),
                format!(
                    "{}, {}",
                    format_date_label(date),
                    self.options.tz.slot_label(slot)
                ),
            ));
        }
        if let Some(motif) = &draft.motif {
            lines.push(("Motif".to_string(), motif.clone()));
        }
        lines
    }
}

impl Drop for BookingPage {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
