//! Rule-based chat assistant.
//!
//! The assistant is an ordered list of `(predicate, response builder)`
//! rules evaluated top-down against the normalized message; the first
//! matching rule answers. When a rule identifies a specialty or a
//! professional, its reply carries a [`BookingSeed`] the caller can hand
//! over to the booking page.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::handoff::BookingSeed;
use crate::models::{Category, Professional};
use crate::text;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(bonjour|bonsoir|salut|coucou|hello|hey|hi)\b").expect("valid regex")
});

static BOOKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(rendez[ -]?vous|rdv|reserver|reservation|prendre|booker|consulter)\b")
        .expect("valid regex")
});

static PRICING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(prix|tarifs?|couts?|combien|payer|cher)\b").expect("valid regex")
});

static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(horaires?|heures?|ouverts?|disponibilites?|disponibles?|quand)\b")
        .expect("valid regex")
});

static CANCEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(annuler|annulation|supprimer|decommander|reporter)\b").expect("valid regex")
});

static THANKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(merci|thanks)\b").expect("valid regex"));

static GOODBYE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(au revoir|bye|a bientot|bonne journee|bonne soiree)\b").expect("valid regex")
});

static HELP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(aide|help|comment|fonctionne|marche)\b|\?$").expect("valid regex")
});

/// Keyword stems mapped to the specialty they suggest, checked when no
/// category name appears verbatim in the message.
const SPECIALTY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Informatique",
        &["informatique", "ordinateur", "pc", "logiciel", "reseau", "wifi", "virus", "bug"],
    ),
    (
        "Santé",
        &["sante", "medecin", "docteur", "douleur", "malade", "consultation", "fievre"],
    ),
    (
        "Psychologie",
        &["psychologue", "psy", "stress", "anxiete", "deprime", "therapie"],
    ),
    (
        "Juridique",
        &["avocat", "juridique", "droit", "contrat", "litige", "notaire"],
    ),
    (
        "Sport",
        &["sport", "coach", "fitness", "musculation", "entrainement", "nutrition"],
    ),
    (
        "Éducation",
        &["cours", "professeur", "soutien", "scolaire", "devoirs", "examen"],
    ),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the assistant understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    Thanks,
    Goodbye,
    Cancellation,
    BookProfessional,
    BookSpecialty,
    Booking,
    Specialty,
    Pricing,
    Hours,
    Greeting,
    Help,
    Fallback,
}

/// A reply from the assistant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub intent: ChatIntent,
    pub text: String,
    /// Quick replies offered to the user.
    pub suggestions: Vec<String>,
    /// Pre-selection for the booking page, when one was identified.
    pub seed: Option<BookingSeed>,
}

impl ChatReply {
    fn new(intent: ChatIntent, text: impl Into<String>) -> Self {
        Self {
            intent,
            text: text.into(),
            suggestions: Vec::new(),
            seed: None,
        }
    }

    fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    fn with_seed(mut self, seed: BookingSeed) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Catalog data the rules may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext<'a> {
    pub categories: &'a [Category],
    pub professionals: &'a [Professional],
}

/// A user message, normalized once for every rule.
pub struct Message<'a> {
    pub raw: &'a str,
    pub normalized: String,
    pub terms: Vec<String>,
}

impl<'a> Message<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            normalized: text::normalize(raw),
            terms: text::terms(raw),
        }
    }

    fn has_term(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }
}

type Predicate = fn(&Message<'_>, &ChatContext<'_>) -> bool;
type Responder = fn(&Message<'_>, &ChatContext<'_>) -> ChatReply;

/// One `(predicate, response builder)` pair.
pub struct ChatRule {
    pub intent: ChatIntent,
    predicate: Predicate,
    respond: Responder,
}

// ---------------------------------------------------------------------------
// Detection helpers
// ---------------------------------------------------------------------------

/// Specialty named in the message: a catalog category first, then the
/// static keyword table (mapped onto a catalog category when possible).
pub fn detect_specialty(message: &Message<'_>, ctx: &ChatContext<'_>) -> Option<String> {
    if let Some(cat) = ctx.categories.iter().find(|c| {
        let name = text::normalize(&c.name);
        !name.is_empty() && message.normalized.contains(&name)
    }) {
        return Some(cat.name.clone());
    }

    let (specialty, _) = SPECIALTY_KEYWORDS.iter().find(|(_, keywords)| {
        keywords.iter().any(|k| message.has_term(k))
    })?;

    let seed = BookingSeed::for_specialty(*specialty);
    Some(
        seed.match_category(ctx.categories)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| specialty.to_string()),
    )
}

/// Professional whose last name appears in the message.
pub fn detect_professional<'c>(
    message: &Message<'_>,
    ctx: &ChatContext<'c>,
) -> Option<&'c Professional> {
    ctx.professionals.iter().find(|p| {
        let last = text::normalize(&p.last_name);
        !last.is_empty() && message.has_term(&last)
    })
}

fn category_names(ctx: &ChatContext<'_>) -> Vec<String> {
    ctx.categories.iter().map(|c| c.name.clone()).collect()
}

fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0} €")
    } else {
        format!("{value:.2} €")
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn default_rules() -> Vec<ChatRule> {
    vec![
        ChatRule {
            intent: ChatIntent::Thanks,
            predicate: |m, _| THANKS_RE.is_match(&m.normalized),
            respond: |_, _| {
                ChatReply::new(
                    ChatIntent::Thanks,
                    "Avec plaisir ! Puis-je vous aider pour autre chose ?",
                )
                .with_suggestions(["Prendre rendez-vous", "Non merci"])
            },
        },
        ChatRule {
            intent: ChatIntent::Goodbye,
            predicate: |m, _| GOODBYE_RE.is_match(&m.normalized),
            respond: |_, _| ChatReply::new(ChatIntent::Goodbye, "À bientôt !"),
        },
        ChatRule {
            intent: ChatIntent::Cancellation,
            predicate: |m, _| CANCEL_RE.is_match(&m.normalized),
            respond: |_, _| {
                ChatReply::new(
                    ChatIntent::Cancellation,
                    "Vous pouvez annuler un rendez-vous depuis votre tableau de bord, \
                     rubrique « Mes rendez-vous ».",
                )
                .with_suggestions(["Voir mes rendez-vous"])
            },
        },
        ChatRule {
            intent: ChatIntent::BookProfessional,
            predicate: |m, ctx| detect_professional(m, ctx).is_some(),
            respond: |m, ctx| match detect_professional(m, ctx) {
                Some(pro) => {
                    let mut seed = BookingSeed::for_professional(pro.clone());
                    if let Some(specialty) = pro.specialties.first() {
                        seed = seed.with_specialty(specialty.clone());
                    }
                    ChatReply::new(
                        ChatIntent::BookProfessional,
                        format!(
                            "Je vous redirige vers les disponibilités de {}.",
                            pro.display_name()
                        ),
                    )
                    .with_seed(seed)
                }
                None => fallback(m, ctx),
            },
        },
        ChatRule {
            intent: ChatIntent::BookSpecialty,
            predicate: |m, ctx| BOOKING_RE.is_match(&m.normalized) && detect_specialty(m, ctx).is_some(),
            respond: |m, ctx| match detect_specialty(m, ctx) {
                Some(specialty) => ChatReply::new(
                    ChatIntent::BookSpecialty,
                    format!(
                        "Très bien, voici les professionnels disponibles en {specialty}."
                    ),
                )
                .with_seed(BookingSeed::for_specialty(specialty)),
                None => fallback(m, ctx),
            },
        },
        ChatRule {
            intent: ChatIntent::Booking,
            predicate: |m, _| BOOKING_RE.is_match(&m.normalized),
            respond: |_, ctx| {
                ChatReply::new(
                    ChatIntent::Booking,
                    "Bien sûr ! Dans quel domaine souhaitez-vous prendre rendez-vous ?",
                )
                .with_suggestions(category_names(ctx))
            },
        },
        ChatRule {
            intent: ChatIntent::Pricing,
            predicate: |m, _| PRICING_RE.is_match(&m.normalized),
            respond: |_, ctx| {
                let tariffs: Vec<f64> = ctx.professionals.iter().filter_map(|p| p.tariff).collect();
                let text = match (
                    tariffs.iter().copied().reduce(f64::min),
                    tariffs.iter().copied().reduce(f64::max),
                ) {
                    (Some(min), Some(max)) if min < max => format!(
                        "Les tarifs varient de {} à {} selon le professionnel.",
                        format_price(min),
                        format_price(max)
                    ),
                    (Some(min), Some(_)) => {
                        format!("Le tarif d'une consultation est de {}.", format_price(min))
                    }
                    _ => "Les tarifs sont indiqués sur la fiche de chaque professionnel."
                        .to_string(),
                };
                ChatReply::new(ChatIntent::Pricing, text).with_suggestions(["Prendre rendez-vous"])
            },
        },
        ChatRule {
            intent: ChatIntent::Specialty,
            predicate: |m, ctx| detect_specialty(m, ctx).is_some(),
            respond: |m, ctx| match detect_specialty(m, ctx) {
                Some(specialty) => ChatReply::new(
                    ChatIntent::Specialty,
                    format!(
                        "Nous avons des professionnels en {specialty}. \
                         Souhaitez-vous prendre rendez-vous ?"
                    ),
                )
                .with_suggestions([format!("Prendre rendez-vous en {specialty}")])
                .with_seed(BookingSeed::for_specialty(specialty)),
                None => fallback(m, ctx),
            },
        },
        ChatRule {
            intent: ChatIntent::Hours,
            predicate: |m, _| HOURS_RE.is_match(&m.normalized),
            respond: |_, _| {
                ChatReply::new(
                    ChatIntent::Hours,
                    "Les créneaux disponibles sont affichés pour chaque professionnel \
                     lors de la prise de rendez-vous.",
                )
                .with_suggestions(["Prendre rendez-vous"])
            },
        },
        ChatRule {
            intent: ChatIntent::Greeting,
            predicate: |m, _| GREETING_RE.is_match(&m.normalized),
            respond: |_, _| {
                ChatReply::new(
                    ChatIntent::Greeting,
                    "Bonjour ! Je suis votre assistant. Comment puis-je vous aider ?",
                )
                .with_suggestions(["Prendre rendez-vous", "Voir les tarifs", "Annuler un rendez-vous"])
            },
        },
        ChatRule {
            intent: ChatIntent::Help,
            predicate: |m, _| HELP_RE.is_match(&m.normalized),
            respond: |_, _| {
                ChatReply::new(
                    ChatIntent::Help,
                    "Je peux vous aider à trouver un professionnel, prendre ou annuler \
                     un rendez-vous, et vous renseigner sur les tarifs.",
                )
                .with_suggestions(["Prendre rendez-vous", "Voir les tarifs"])
            },
        },
    ]
}

fn fallback(_: &Message<'_>, ctx: &ChatContext<'_>) -> ChatReply {
    ChatReply::new(
        ChatIntent::Fallback,
        "Je n'ai pas bien compris. Pouvez-vous préciser le domaine ou le professionnel recherché ?",
    )
    .with_suggestions(category_names(ctx))
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

/// The chat assistant: an ordered rule list, first match wins.
pub struct ChatAssistant {
    rules: Vec<ChatRule>,
}

impl Default for ChatAssistant {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl ChatAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intents in evaluation order.
    pub fn intents(&self) -> Vec<ChatIntent> {
        self.rules.iter().map(|r| r.intent).collect()
    }

    /// Answer one message.
    pub fn respond(&self, input: &str, ctx: &ChatContext<'_>) -> ChatReply {
        let message = Message::new(input);
        if message.normalized.is_empty() {
            return fallback(&message, ctx);
        }
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&message, ctx))
            .map(|rule| (rule.respond)(&message, ctx))
            .unwrap_or_else(|| fallback(&message, ctx))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category {
                id: 1,
                name: "Informatique".into(),
                description: None,
            },
            Category {
                id: 2,
                name: "Santé".into(),
                description: None,
            },
        ]
    }

    fn professionals() -> Vec<Professional> {
        vec![
            Professional {
                id: 42,
                first_name: "Jean".into(),
                last_name: "Dupont".into(),
                photo: None,
                tariff: Some(40.0),
                specialties: vec!["Informatique".into()],
                description: None,
            },
            Professional {
                id: 43,
                first_name: "Marie".into(),
                last_name: "Lefèvre".into(),
                photo: None,
                tariff: Some(65.5),
                specialties: vec!["Santé".into()],
                description: None,
            },
        ]
    }

    fn ask(input: &str) -> ChatReply {
        let cats = categories();
        let pros = professionals();
        let ctx = ChatContext {
            categories: &cats,
            professionals: &pros,
        };
        ChatAssistant::new().respond(input, &ctx)
    }

    #[test]
    fn greeting() {
        let reply = ask("Bonjour");
        assert_eq!(reply.intent, ChatIntent::Greeting);
        assert!(reply.seed.is_none());
        assert!(!reply.suggestions.is_empty());
    }

    #[test]
    fn booking_with_catalog_specialty_produces_seed() {
        let reply = ask("Bonjour, je voudrais un rendez-vous en santé");
        assert_eq!(reply.intent, ChatIntent::BookSpecialty);
        assert_eq!(
            reply.seed.and_then(|s| s.specialty).as_deref(),
            Some("Santé")
        );
    }

    #[test]
    fn keyword_maps_onto_catalog_category() {
        let reply = ask("mon ordinateur a un virus, je veux réserver");
        assert_eq!(reply.intent, ChatIntent::BookSpecialty);
        assert_eq!(
            reply.seed.and_then(|s| s.specialty).as_deref(),
            Some("Informatique")
        );
    }

    #[test]
    fn booking_without_specialty_asks_for_domain() {
        let reply = ask("je veux prendre un rdv");
        assert_eq!(reply.intent, ChatIntent::Booking);
        assert_eq!(reply.suggestions, vec!["Informatique", "Santé"]);
        assert!(reply.seed.is_none());
    }

    #[test]
    fn professional_name_produces_professional_seed() {
        let reply = ask("Est-ce que je peux voir M. Lefevre ?");
        assert_eq!(reply.intent, ChatIntent::BookProfessional);
        let seed = reply.seed.unwrap();
        assert_eq!(seed.professional_id, Some(43));
        assert_eq!(seed.specialty.as_deref(), Some("Santé"));
    }

    #[test]
    fn pricing_reports_range() {
        let reply = ask("Quels sont vos tarifs ?");
        assert_eq!(reply.intent, ChatIntent::Pricing);
        assert!(reply.text.contains("40 €"));
        assert!(reply.text.contains("65.50 €"));
    }

    #[test]
    fn cancellation_beats_booking() {
        let reply = ask("je veux annuler mon rendez-vous");
        assert_eq!(reply.intent, ChatIntent::Cancellation);
    }

    #[test]
    fn specialty_mention_without_booking_intent() {
        let reply = ask("j'ai du stress");
        assert_eq!(reply.intent, ChatIntent::Specialty);
        // Not in the catalog: keeps the keyword table's name.
        assert_eq!(
            reply.seed.and_then(|s| s.specialty).as_deref(),
            Some("Psychologie")
        );
    }

    #[test]
    fn thanks_and_goodbye() {
        assert_eq!(ask("merci beaucoup").intent, ChatIntent::Thanks);
        assert_eq!(ask("au revoir").intent, ChatIntent::Goodbye);
    }

    #[test]
    fn unknown_and_empty_input_fall_back() {
        assert_eq!(ask("xyzzy").intent, ChatIntent::Fallback);
        assert_eq!(ask("   ").intent, ChatIntent::Fallback);
    }

    #[test]
    fn rules_evaluate_in_declared_order() {
        let intents = ChatAssistant::new().intents();
        assert_eq!(intents.first(), Some(&ChatIntent::Thanks));
        assert_eq!(intents.last(), Some(&ChatIntent::Help));
    }
}
