//! Search box heuristics.
//!
//! Filters and ranks the in-memory catalog (categories and professionals)
//! against a free-text query. Matching is accent- and case-insensitive;
//! every query term must match some field (AND semantics) and the last
//! term matches as a word prefix so results update while typing.

use std::cmp::Ordering;

use serde::Serialize;

use crate::handoff::BookingSeed;
use crate::models::{Category, Professional};
use crate::text;

// ---------------------------------------------------------------------------
// Relevance weights
// ---------------------------------------------------------------------------

/// Weight of a term found in a name.
pub const WEIGHT_NAME: u32 = 3;

/// Weight of a term found in a specialty.
pub const WEIGHT_SPECIALTY: u32 = 2;

/// Weight of a term found in a description.
pub const WEIGHT_DESCRIPTION: u32 = 1;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Default number of results per section.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Maximum number of results per section.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Ordering applied to professional results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAscending,
    PriceDescending,
    Name,
}

/// A parsed search request.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub max_tariff: Option<f64>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// A category hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryHit {
    pub category: Category,
    pub score: u32,
}

/// A professional hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessionalHit {
    pub professional: Professional,
    pub score: u32,
}

impl CategoryHit {
    /// Seed for booking within this category.
    pub fn seed(&self) -> BookingSeed {
        BookingSeed::for_specialty(self.category.name.clone())
    }
}

impl ProfessionalHit {
    /// Seed for booking with this professional.
    pub fn seed(&self) -> BookingSeed {
        let mut seed = BookingSeed::for_professional(self.professional.clone());
        if let Some(specialty) = self.professional.specialties.first() {
            seed = seed.with_specialty(specialty.clone());
        }
        seed
    }
}

/// Ranked search output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub categories: Vec<CategoryHit>,
    pub professionals: Vec<ProfessionalHit>,
    /// Category whose name the whole query designates, if any.
    pub detected_specialty: Option<String>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.professionals.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Whether `term` matches a word of the normalized `field`: exact word,
/// or word prefix when `prefix` is set.
fn field_matches(field: &str, term: &str, prefix: bool) -> bool {
    text::terms(field)
        .iter()
        .any(|word| word == term || (prefix && word.starts_with(term)))
}

/// Score one entity. `fields` are `(weight, text)` pairs; returns `None`
/// when some term matches no field.
fn score_fields(terms: &[String], fields: &[(u32, &str)]) -> Option<u32> {
    let last = terms.len().saturating_sub(1);
    let mut total = 0;
    for (i, term) in terms.iter().enumerate() {
        let prefix = i == last;
        let best = fields
            .iter()
            .filter(|(_, field)| field_matches(field, term, prefix))
            .map(|(weight, _)| *weight)
            .max()?;
        total += best;
    }
    Some(total)
}

fn score_category(terms: &[String], category: &Category) -> Option<u32> {
    let description = category.description.as_deref().unwrap_or_default();
    score_fields(
        terms,
        &[(WEIGHT_NAME, category.name.as_str()), (WEIGHT_DESCRIPTION, description)],
    )
}

fn score_professional(terms: &[String], professional: &Professional) -> Option<u32> {
    let name = professional.display_name();
    let specialties = professional.specialties.join(" ");
    let description = professional.description.as_deref().unwrap_or_default();
    score_fields(
        terms,
        &[
            (WEIGHT_NAME, name.as_str()),
            (WEIGHT_SPECIALTY, specialties.as_str()),
            (WEIGHT_DESCRIPTION, description),
        ],
    )
}

fn compare_tariff(a: Option<f64>, b: Option<f64>) -> Ordering {
    // Professionals without a tariff sort last in both directions.
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Category whose normalized name equals the whole normalized query.
pub fn detect_specialty(query: &str, categories: &[Category]) -> Option<String> {
    let needle = text::normalize(query);
    if needle.is_empty() {
        return None;
    }
    categories
        .iter()
        .find(|c| text::normalize(&c.name) == needle)
        .map(|c| c.name.clone())
}

/// Run a search over the in-memory catalog.
///
/// An empty query yields no results.
pub fn search(
    query: &SearchQuery,
    categories: &[Category],
    professionals: &[Professional],
) -> SearchResults {
    let terms = text::terms(&query.text);
    if terms.is_empty() {
        return SearchResults::default();
    }
    let limit = clamp_limit(query.limit);

    let mut category_hits: Vec<CategoryHit> = categories
        .iter()
        .filter_map(|c| {
            score_category(&terms, c).map(|score| CategoryHit {
                category: c.clone(),
                score,
            })
        })
        .collect();
    category_hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| text::normalize(&a.category.name).cmp(&text::normalize(&b.category.name)))
    });
    category_hits.truncate(limit);

    let mut professional_hits: Vec<ProfessionalHit> = professionals
        .iter()
        .filter(|p| match (query.max_tariff, p.tariff) {
            (Some(max), Some(tariff)) => tariff <= max,
            _ => true,
        })
        .filter_map(|p| {
            score_professional(&terms, p).map(|score| ProfessionalHit {
                professional: p.clone(),
                score,
            })
        })
        .collect();

    let by_name = |a: &ProfessionalHit, b: &ProfessionalHit| {
        text::normalize(&a.professional.display_name())
            .cmp(&text::normalize(&b.professional.display_name()))
    };
    match query.sort {
        SortOrder::Relevance => {
            professional_hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| by_name(a, b)))
        }
        SortOrder::PriceAscending => professional_hits.sort_by(|a, b| {
            compare_tariff(a.professional.tariff, b.professional.tariff).then_with(|| by_name(a, b))
        }),
        SortOrder::PriceDescending => professional_hits.sort_by(|a, b| {
            let ordering = match (a.professional.tariff, b.professional.tariff) {
                (Some(_), Some(_)) => {
                    compare_tariff(b.professional.tariff, a.professional.tariff)
                }
                _ => compare_tariff(a.professional.tariff, b.professional.tariff),
            };
            ordering.then_with(|| by_name(a, b))
        }),
        SortOrder::Name => professional_hits.sort_by(by_name),
    }
    professional_hits.truncate(limit);

    SearchResults {
        categories: category_hits,
        professionals: professional_hits,
        detected_specialty: detect_specialty(&query.text, categories),
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
                description: Some("Dépannage, réseaux et logiciels".into()),
            },
            Category {
                id: 2,
                name: "Santé".into(),
                description: Some("Médecine générale".into()),
            },
        ]
    }

    fn pro(id: i64, first: &str, last: &str, tariff: Option<f64>, specialties: &[&str]) -> Professional {
        Professional {
            id,
            first_name: first.into(),
            last_name: last.into(),
            photo: None,
            tariff,
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
            description: None,
        }
    }

    fn professionals() -> Vec<Professional> {
        vec![
            pro(1, "Jean", "Dupont", Some(50.0), &["Réseaux", "Sécurité"]),
            pro(2, "Marie", "Réseau", Some(30.0), &["Cardiologie"]),
            pro(3, "Paul", "Martin", None, &["Réseaux"]),
            pro(4, "Anne", "Durand", Some(80.0), &["Pédiatrie"]),
        ]
    }

    fn run(query: SearchQuery) -> SearchResults {
        search(&query, &categories(), &professionals())
    }

    fn ids(results: &SearchResults) -> Vec<i64> {
        results.professionals.iter().map(|h| h.professional.id).collect()
    }

    #[test]
    fn empty_query_returns_nothing() {
        assert!(run(SearchQuery::new("   ")).is_empty());
    }

    #[test]
    fn name_outranks_specialty() {
        let results = run(SearchQuery::new("reseau"));
        // Marie Réseau (name) first, then specialty matches by name.
        assert_eq!(ids(&results), vec![2, 1, 3]);
        assert_eq!(results.professionals[0].score, WEIGHT_NAME);
        assert_eq!(results.professionals[1].score, WEIGHT_SPECIALTY);
    }

    #[test]
    fn all_terms_must_match() {
        let results = run(SearchQuery::new("jean securite"));
        assert_eq!(ids(&results), vec![1]);
        assert!(run(SearchQuery::new("jean cardiologie")).professionals.is_empty());
    }

    #[test]
    fn last_term_matches_as_prefix() {
        assert_eq!(ids(&run(SearchQuery::new("dur"))), vec![4]);
        // Non-final terms need a whole word.
        assert!(run(SearchQuery::new("dur anne")).professionals.is_empty());
    }

    #[test]
    fn categories_match_on_name_and_description() {
        let results = run(SearchQuery::new("médecine"));
        assert_eq!(results.categories.len(), 1);
        assert_eq!(results.categories[0].category.id, 2);
        assert_eq!(results.categories[0].score, WEIGHT_DESCRIPTION);
    }

    #[test]
    fn detected_specialty_requires_full_name() {
        assert_eq!(
            run(SearchQuery::new("sante")).detected_specialty.as_deref(),
            Some("Santé")
        );
        assert!(run(SearchQuery::new("san")).detected_specialty.is_none());
    }

    #[test]
    fn max_tariff_filters_but_keeps_unpriced() {
        let mut query = SearchQuery::new("reseaux");
        query.max_tariff = Some(40.0);
        assert_eq!(ids(&run(query)), vec![3]);
    }

    #[test]
    fn price_sorting_puts_unpriced_last() {
        let mut query = SearchQuery::new("r");
        query.sort = SortOrder::PriceAscending;
        let results = run(query.clone());
        assert_eq!(ids(&results), vec![2, 1, 3]);

        query.sort = SortOrder::PriceDescending;
        assert_eq!(ids(&run(query)), vec![1, 2, 3]);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_SEARCH_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(1000)), MAX_SEARCH_LIMIT);

        let mut query = SearchQuery::new("reseau");
        query.limit = Some(1);
        assert_eq!(ids(&run(query)), vec![2]);
    }

    #[test]
    fn hits_produce_seeds() {
        let results = run(SearchQuery::new("dupont"));
        let seed = results.professionals[0].seed();
        assert_eq!(seed.professional_id, Some(1));
        assert_eq!(seed.specialty.as_deref(), Some("Réseaux"));

        let results = run(SearchQuery::new("informatique"));
        assert_eq!(results.categories[0].seed().specialty.as_deref(), Some("Informatique"));
    }
}
