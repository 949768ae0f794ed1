//! Search box over the in-memory catalog.
//!
//! Results are numbered categories first, then professionals; picking
//! one hands its seed to the booking page.

use std::sync::Arc;

use rdv_core::error::CoreError;
use rdv_core::handoff::BookingSeed;
use rdv_core::search::{search, SearchQuery, SearchResults, SortOrder};

use crate::catalog::Catalog;
use crate::error::AppResult;
use crate::handoff::SeedOutbox;

pub struct SearchBox {
    outbox: Arc<SeedOutbox>,
    query: SearchQuery,
    results: SearchResults,
}

impl SearchBox {
    pub fn new(outbox: Arc<SeedOutbox>) -> Self {
        Self {
            outbox,
            query: SearchQuery::default(),
            results: SearchResults::default(),
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    /// Run `text` with the given filters against `catalog`.
    pub fn search(
        &mut self,
        text: &str,
        max_tariff: Option<f64>,
        sort: SortOrder,
        catalog: &Catalog,
    ) -> &SearchResults {
        self.query = SearchQuery {
            text: text.trim().to_string(),
            max_tariff,
            sort,
            limit: None,
        };
        self.results = search(&self.query, &catalog.categories, &catalog.professionals);
        tracing::debug!(
            query = %self.query.text,
            categories = self.results.categories.len(),
            professionals = self.results.professionals.len(),
            "Search ran"
        );
        &self.results
    }

    /// Number of pickable results.
    pub fn len(&self) -> usize {
        self.results.categories.len() + self.results.professionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick the result at 1-based `position` and hand its seed off.
    /// `catalog` is the one the results came from.
    pub fn pick(&self, position: usize, catalog: &Catalog) -> AppResult<BookingSeed> {
        let categories = self.results.categories.len();
        let seed = match position.checked_sub(1) {
            Some(i) if i < categories => self.results.categories[i].seed(),
            Some(i) if i < self.len() => self.results.professionals[i - categories].seed(),
            _ => {
                return Err(CoreError::Validation(format!(
                    "Choisissez un résultat entre 1 et {}.",
                    self.len()
                ))
                .into())
            }
        };
        let seed = catalog.locate(seed);
        self.outbox.publish(seed.clone())?;
        Ok(seed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
