//! Line-oriented terminal front-end.
//!
//! [`parse_command`] turns an input line into a [`Command`]; a [`Session`]
//! executes commands against the controllers and returns the text to
//! print. The binary only reads lines and prints what the session returns.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use rdv_client::{Storage, AUTH_TOKEN_KEY};
use rdv_core::booking_workflow::{BookingStep, MAX_STEP};
use rdv_core::chat::ChatReply;
use rdv_core::dashboard::{can_cancel, DashboardSummary};
use rdv_core::error::CoreError;
use rdv_core::handoff::BookingSeed;
use rdv_core::models::Booking;
use rdv_core::search::{SearchResults, SortOrder};
use rdv_core::types::{EntityId, Timestamp};
use rdv_events::EventBus;

use crate::backend::BookingBackend;
use crate::booking_page::{BookingPage, PageOptions, PageView};
use crate::catalog::Catalog;
use crate::chat_widget::{ChatWidget, WELCOME_MESSAGE};
use crate::dashboard::Dashboard;
use crate::error::{AppError, AppResult};
use crate::handoff::{seed_handoff, SeedInbox};
use crate::search_box::SearchBox;

pub const HELP: &str = "\
Commandes :
  book                      recommencer une réservation
  <n>                       choisir l'élément n de la liste affichée
  date <n>                  afficher les créneaux de la date n
  back                      revenir à l'étape précédente
  retry                     recharger l'étape après une erreur
  motif <texte>             indiquer le motif du rendez-vous
  confirm                   valider la réservation
  chat <message>            parler à l'assistant
  search <texte> [--max N] [--sort pertinence|prix|prix-desc|nom]
  pick <n>                  réserver à partir du résultat de recherche n
  dashboard                 afficher mes rendez-vous
  cancel <id>               annuler un rendez-vous
  delete <id>               supprimer un rendez-vous de l'historique
  token <jeton>             enregistrer le jeton de connexion
  logout                    oublier le jeton de connexion
  help                      afficher cette aide
  quit                      quitter";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Book,
    Choose(usize),
    Date(usize),
    Back,
    Retry,
    Motif(String),
    Confirm,
    Chat(String),
    Search {
        text: String,
        max_tariff: Option<f64>,
        sort: SortOrder,
    },
    Pick(usize),
    Dashboard,
    Cancel(EntityId),
    Delete(EntityId),
    Token(String),
    Logout,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation(message.into())
}

fn parse_position(raw: &str) -> Result<usize, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(format!("« {} » n'est pas un numéro valide.", raw.trim())))
}

fn parse_id(raw: &str) -> Result<EntityId, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(format!("« {} » n'est pas un identifiant valide.", raw.trim())))
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, CoreError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(invalid(format!("Usage : {usage}")));
    }
    Ok(rest)
}

fn parse_sort(raw: &str) -> Result<SortOrder, CoreError> {
    match raw {
        "pertinence" => Ok(SortOrder::Relevance),
        "prix" => Ok(SortOrder::PriceAscending),
        "prix-desc" => Ok(SortOrder::PriceDescending),
        "nom" => Ok(SortOrder::Name),
        other => Err(invalid(format!("Tri inconnu : « {other} »."))),
    }
}

fn parse_search(rest: &str) -> Result<Command, CoreError> {
    let mut words = Vec::new();
    let mut max_tariff = None;
    let mut sort = SortOrder::Relevance;

    let mut tokens = rest.split_whitespace();
    while let Some(token) = tokens.next() {
        match token {
            "--max" => {
                let raw = tokens
                    .next()
                    .ok_or_else(|| invalid("--max attend un montant."))?;
                let value: f64 = raw
                    .replace(',', ".")
                    .parse()
                    .map_err(|_| invalid(format!("Montant invalide : « {raw} ».")))?;
                max_tariff = Some(value);
            }
            "--sort" => {
                let raw = tokens
                    .next()
                    .ok_or_else(|| invalid("--sort attend un ordre de tri."))?;
                sort = parse_sort(raw)?;
            }
            word => words.push(word),
        }
    }

    if words.is_empty() {
        return Err(invalid("Usage : search <texte>"));
    }
    Ok(Command::Search {
        text: words.join(" "),
        max_tariff,
        sort,
    })
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CoreError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(invalid("Tapez `help` pour la liste des commandes."));
    }
    if line.chars().all(|c| c.is_ascii_digit()) {
        return Ok(Command::Choose(parse_position(line)?));
    }

    let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match keyword.to_lowercase().as_str() {
        "book" => Ok(Command::Book),
        "date" => Ok(Command::Date(parse_position(required(rest, "date <n>")?)?)),
        "back" => Ok(Command::Back),
        "retry" => Ok(Command::Retry),
        // An empty motif is a validation error raised by the booking page.
        "motif" => Ok(Command::Motif(rest.to_string())),
        "confirm" => Ok(Command::Confirm),
        "chat" => Ok(Command::Chat(required(rest, "chat <message>")?.to_string())),
        "search" => parse_search(rest),
        "pick" => Ok(Command::Pick(parse_position(required(rest, "pick <n>")?)?)),
        "dashboard" => Ok(Command::Dashboard),
        "cancel" => Ok(Command::Cancel(parse_id(required(rest, "cancel <id>")?)?)),
        "delete" => Ok(Command::Delete(parse_id(required(rest, "delete <id>")?)?)),
        "token" => Ok(Command::Token(required(rest, "token <jeton>")?.to_string())),
        "logout" => Ok(Command::Logout),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(invalid(format!(
            "Commande inconnue : « {other} ». Tapez `help`."
        ))),
    }
}

/// Parse the command-line arguments: an optional `--seed <query>`.
pub fn parse_args<I>(args: I) -> AppResult<Option<BookingSeed>>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut seed = None;
    while let Some(arg) = args.next() {
        let query = match arg.strip_prefix("--seed=") {
            Some(query) => query.to_string(),
            None if arg == "--seed" => args
                .next()
                .ok_or_else(|| AppError::Config("--seed expects a query string".into()))?,
            None => return Err(AppError::Config(format!("Unknown argument '{arg}'"))),
        };
        seed = Some(BookingSeed::from_query(&query)).filter(|s| !s.is_empty());
    }
    Ok(seed)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn format_tariff(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0} €")
    } else {
        format!("{value:.2} €")
    }
}

/// Render the booking page.
pub fn render_page(view: &PageView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== Étape {}/{} : {} ==",
        view.step_number, MAX_STEP, view.title
    );
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "{notice}");
    }
    if view.step != BookingStep::Confirm {
        for (label, value) in &view.summary {
            let _ = writeln!(out, "  {label} : {value}");
        }
    }
    if view.loading {
        let _ = writeln!(out, "Chargement…");
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "! {error}");
        if view.step != BookingStep::Confirm {
            let _ = writeln!(out, "  Tapez `retry` pour réessayer.");
        }
    }

    match view.step {
        BookingStep::SelectCategory => {
            for (i, choice) in view.categories.iter().enumerate() {
                match &choice.detail {
                    Some(detail) => {
                        let _ = writeln!(out, "  {}. {} - {}", i + 1, choice.label, detail);
                    }
                    None => {
                        let _ = writeln!(out, "  {}. {}", i + 1, choice.label);
                    }
                }
            }
        }
        BookingStep::SelectProfessional => {
            if !view.loading && view.error.is_none() && view.professionals.is_empty() {
                let _ = writeln!(out, "Aucun professionnel dans ce domaine pour le moment.");
            }
            for (i, card) in view.professionals.iter().enumerate() {
                let mut line = format!("  {}. {}", i + 1, card.name);
                if let Some(tariff) = card.tariff {
                    let _ = write!(line, " ({})", format_tariff(tariff));
                }
                if !card.specialties.is_empty() {
                    let _ = write!(line, " [{}]", card.specialties.join(", "));
                }
                let _ = writeln!(out, "{line}");
                let _ = writeln!(out, "     photo : {}", card.avatar_url);
                if let Some(description) = &card.description {
                    let _ = writeln!(out, "     {description}");
                }
            }
        }
        BookingStep::SelectAvailability => {
            if view.no_availability {
                let _ = writeln!(
                    out,
                    "Aucun créneau disponible pour ce professionnel. Tapez `back` pour en choisir un autre."
                );
            } else if !view.dates.is_empty() {
                let tabs: Vec<String> = view
                    .dates
                    .iter()
                    .enumerate()
                    .map(|(i, tab)| {
                        let marker = if tab.selected { "*" } else { " " };
                        format!("{marker}[{}] {} ({})", i + 1, tab.label, tab.slot_count)
                    })
                    .collect();
                let _ = writeln!(out, "Dates : {}", tabs.join("  "));
                for (i, slot) in view.slots.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", i + 1, slot.label);
                }
            }
        }
        BookingStep::EnterMotif => {
            if let Some(error) = &view.motif_error {
                let _ = writeln!(out, "! {error}");
            }
            let _ = writeln!(out, "Tapez `motif <texte>` pour décrire votre demande.");
        }
        BookingStep::Confirm => {
            let _ = writeln!(out, "Récapitulatif :");
            for (label, value) in &view.summary {
                let _ = writeln!(out, "  {label} : {value}");
            }
            let _ = writeln!(
                out,
                "Tapez `confirm` pour valider ou `back` pour modifier."
            );
        }
    }
    out
}

pub fn render_chat_reply(reply: &ChatReply) -> String {
    let mut out = format!("Assistant : {}\n", reply.text);
    if !reply.suggestions.is_empty() {
        let _ = writeln!(out, "  Suggestions : {}", reply.suggestions.join(" | "));
    }
    out
}

pub fn render_search(results: &SearchResults) -> String {
    if results.is_empty() {
        return "Aucun résultat.\n".to_string();
    }
    let mut out = String::new();
    if let Some(specialty) = &results.detected_specialty {
        let _ = writeln!(out, "Domaine reconnu : {specialty}");
    }
    let mut position = 0;
    for hit in &results.categories {
        position += 1;
        let _ = writeln!(out, "  {position}. [domaine] {}", hit.category.name);
    }
    for hit in &results.professionals {
        position += 1;
        let mut line = format!(
            "  {position}. [professionnel] {}",
            hit.professional.display_name()
        );
        if let Some(tariff) = hit.professional.tariff {
            let _ = write!(line, " ({})", format_tariff(tariff));
        }
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "Tapez `pick <n>` pour réserver.");
    out
}

fn booking_line(booking: &Booking, now: Timestamp, options: &PageOptions) -> String {
    let who = match (&booking.professional, booking.professional_id) {
        (Some(p), _) => p.display_name(),
        (None, Some(id)) => format!("professionnel #{id}"),
        (None, None) => "professionnel".to_string(),
    };
    let mut line = format!(
        "  #{} {} avec {} - {} ({})",
        booking.id,
        options.tz.format(&booking.date, "%d/%m/%Y %H:%M"),
        who,
        booking.motif,
        booking.status.label()
    );
    if can_cancel(booking, now) {
        line.push_str(" [annulable]");
    }
    line
}

pub fn render_dashboard(summary: &DashboardSummary, now: Timestamp, options: &PageOptions) -> String {
    let mut out = format!("== Mes rendez-vous ({}) ==\n", summary.total());
    if let Some(next) = summary.next_booking() {
        let _ = writeln!(
            out,
            "Prochain rendez-vous : {}",
            options.tz.format(&next.date, "%d/%m/%Y %H:%M")
        );
    }
    let _ = writeln!(out, "À venir :");
    if summary.upcoming.is_empty() {
        let _ = writeln!(out, "  (aucun)");
    }
    for booking in &summary.upcoming {
        let _ = writeln!(out, "{}", booking_line(booking, now, options));
    }
    let _ = writeln!(out, "Passés et annulés :");
    if summary.past.is_empty() {
        let _ = writeln!(out, "  (aucun)");
    }
    for booking in &summary.past {
        let _ = writeln!(out, "{}", booking_line(booking, now, options));
    }
    out
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the front-end should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Print(String),
    Quit,
}

/// One interactive session: the booking page, the widgets and the
/// dashboard wired to one backend.
pub struct Session {
    backend: Arc<dyn BookingBackend>,
    storage: Arc<dyn Storage>,
    options: PageOptions,
    page: BookingPage,
    chat: ChatWidget,
    search: SearchBox,
    dashboard: Dashboard,
    inbox: SeedInbox,
    catalog: Option<Catalog>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn BookingBackend>,
        storage: Arc<dyn Storage>,
        options: PageOptions,
    ) -> Self {
        let bus = Arc::new(EventBus::default());
        let (outbox, inbox) = seed_handoff(Arc::clone(&storage));
        let outbox = Arc::new(outbox);

        Self {
            page: BookingPage::new(Arc::clone(&backend), options.clone())
                .with_events(Arc::clone(&bus)),
            chat: ChatWidget::new(Arc::clone(&outbox)),
            search: SearchBox::new(outbox),
            dashboard: Dashboard::new(Arc::clone(&backend)).with_events(bus),
            inbox,
            catalog: None,
            backend,
            storage,
            options,
        }
    }

    pub fn page(&self) -> &BookingPage {
        &self.page
    }

    /// Load step 1 and apply the start-up seed: the one given on the
    /// command line, else one left in storage by a previous session.
    pub async fn start(&mut self, seed: Option<BookingSeed>) -> AppResult<String> {
        self.page.load_categories();
        let persisted = self.inbox.take_persisted()?;
        if let Some(seed) = seed.or(persisted) {
            self.page.apply_seed(seed);
        }
        self.page.settle().await;
        Ok(format!("{WELCOME_MESSAGE}\n{}", render_page(&self.page.view())))
    }

    /// Execute one command.
    pub async fn handle(&mut self, command: Command) -> AppResult<Outcome> {
        let output = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Help => HELP.to_string(),
            Command::Book => {
                self.page.restart();
                self.render_page().await
            }
            Command::Choose(position) => {
                self.choose(position)?;
                self.render_page().await
            }
            Command::Date(position) => {
                let view = self.page.view();
                let tab = position
                    .checked_sub(1)
                    .and_then(|i| view.dates.get(i))
                    .ok_or_else(|| out_of_range(view.dates.len()))?;
                self.page.choose_date(tab.date)?;
                self.render_page().await
            }
            Command::Back => {
                self.page.back()?;
                self.render_page().await
            }
            Command::Retry => {
                self.page.retry()?;
                self.render_page().await
            }
            Command::Motif(text) => {
                // The inline error is part of the rendered page.
                match self.page.submit_motif(&text) {
                    Ok(()) | Err(AppError::Core(CoreError::Validation(_))) => {}
                    Err(e) => return Err(e),
                }
                self.render_page().await
            }
            Command::Confirm => {
                // Failures are rendered on the confirmation step.
                match self.page.confirm().await {
                    Ok(_) | Err(AppError::Api(_)) => {}
                    Err(e) => return Err(e),
                }
                self.render_page().await
            }
            Command::Chat(message) => {
                self.ensure_catalog().await?;
                let reply = self.chat.send(&message, loaded(&self.catalog)?)?;
                let mut out = render_chat_reply(&reply);
                if reply.seed.is_some() {
                    out.push_str(&self.absorb_seed().await?);
                }
                out
            }
            Command::Search {
                text,
                max_tariff,
                sort,
            } => {
                self.ensure_catalog().await?;
                let catalog = loaded(&self.catalog)?;
                render_search(self.search.search(&text, max_tariff, sort, catalog))
            }
            Command::Pick(position) => {
                self.ensure_catalog().await?;
                self.search.pick(position, loaded(&self.catalog)?)?;
                self.absorb_seed().await?
            }
            Command::Dashboard => {
                let now = Utc::now();
                let summary = self.dashboard.show(now).await?;
                render_dashboard(summary, now, &self.options)
            }
            Command::Cancel(id) => {
                let now = Utc::now();
                self.ensure_dashboard(now).await?;
                self.dashboard.cancel(id, now).await?;
                self.render_dashboard(now)
            }
            Command::Delete(id) => {
                let now = Utc::now();
                self.ensure_dashboard(now).await?;
                self.dashboard.delete(id, now).await?;
                self.render_dashboard(now)
            }
            Command::Token(token) => {
                self.storage.set(AUTH_TOKEN_KEY, token.trim())?;
                tracing::info!("Auth token stored");
                "Jeton enregistré.\n".to_string()
            }
            Command::Logout => {
                self.storage.remove(AUTH_TOKEN_KEY)?;
                tracing::info!("Auth token removed");
                "Jeton supprimé.\n".to_string()
            }
        };
        Ok(Outcome::Print(output))
    }

    fn choose(&mut self, position: usize) -> AppResult<()> {
        let view = self.page.view();
        let index = position.checked_sub(1);
        match view.step {
            BookingStep::SelectCategory => {
                let choice = index
                    .and_then(|i| view.categories.get(i))
                    .ok_or_else(|| out_of_range(view.categories.len()))?;
                self.page.choose_category(choice.id)
            }
            BookingStep::SelectProfessional => {
                let card = index
                    .and_then(|i| view.professionals.get(i))
                    .ok_or_else(|| out_of_range(view.professionals.len()))?;
                self.page.choose_professional(card.id)
            }
            BookingStep::SelectAvailability => {
                let slot = index
                    .and_then(|i| view.slots.get(i))
                    .ok_or_else(|| out_of_range(view.slots.len()))?;
                self.page.choose_slot(slot.id)
            }
            BookingStep::EnterMotif | BookingStep::Confirm => Err(CoreError::InvalidTransition(
                "No list to choose from on this step".to_string(),
            )
            .into()),
        }
    }

    async fn render_page(&mut self) -> String {
        self.page.settle().await;
        render_page(&self.page.view())
    }

    /// Apply a seed handed off by a widget and show the booking page.
    async fn absorb_seed(&mut self) -> AppResult<String> {
        if let Some(seed) = self.inbox.take()? {
            self.page.apply_seed(seed);
        }
        Ok(self.render_page().await)
    }

    /// Load the catalog on first use.
    async fn ensure_catalog(&mut self) -> AppResult<()> {
        if self.catalog.is_none() {
            self.catalog = Some(Catalog::load(self.backend.as_ref()).await?);
        }
        Ok(())
    }

    async fn ensure_dashboard(&mut self, now: Timestamp) -> AppResult<()> {
        if self.dashboard.summary().is_none() {
            self.dashboard.refresh(now).await?;
        }
        Ok(())
    }

    fn render_dashboard(&self, now: Timestamp) -> String {
        match self.dashboard.summary() {
            Some(summary) => render_dashboard(summary, now, &self.options),
            None => String::new(),
        }
    }
}

fn loaded(catalog: &Option<Catalog>) -> AppResult<&Catalog> {
    catalog
        .as_ref()
        .ok_or_else(|| CoreError::Internal("Catalog not loaded".into()).into())
}

fn out_of_range(len: usize) -> AppError {
    if len == 0 {
        return invalid("Aucun élément à choisir.").into();
    }
    invalid(format!("Choisissez un numéro entre 1 et {len}.")).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
