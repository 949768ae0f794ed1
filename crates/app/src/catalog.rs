//! In-memory catalog consulted by the chat assistant and the search box.

use std::collections::HashMap;

use futures::future::join_all;
use rdv_core::chat::ChatContext;
use rdv_core::handoff::BookingSeed;
use rdv_core::models::{Category, Professional};
use rdv_core::types::EntityId;

use crate::backend::BookingBackend;
use crate::error::AppResult;

/// Every category and every professional, professionals deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub professionals: Vec<Professional>,
    /// Professional id → id of the first category listing them.
    pub listed_in: HashMap<EntityId, EntityId>,
}

impl Catalog {
    /// Load the categories, then the professionals of every category
    /// concurrently. A category whose professionals fail to load is
    /// skipped with a warning; failing to list categories is an error.
    pub async fn load(backend: &dyn BookingBackend) -> AppResult<Self> {
        let categories = backend.categories().await?;
        let lists = join_all(categories.iter().map(|c| backend.professionals(c.id))).await;

        let mut listed_in = HashMap::new();
        let mut professionals = Vec::new();
        for (category, result) in categories.iter().zip(lists) {
            match result {
                Ok(list) => {
                    for professional in list {
                        if !listed_in.contains_key(&professional.id) {
                            listed_in.insert(professional.id, category.id);
                            professionals.push(professional);
                        }
                    }
                }
                Err(e) => tracing::warn!(
                    category_id = category.id,
                    error = %e,
                    "Skipping category whose professionals failed to load"
                ),
            }
        }

        tracing::debug!(
            categories = categories.len(),
            professionals = professionals.len(),
            "Catalog loaded"
        );
        Ok(Self {
            categories,
            professionals,
            listed_in,
        })
    }

    /// Category the professional was loaded from.
    pub fn category_of(&self, professional_id: EntityId) -> Option<EntityId> {
        self.listed_in.get(&professional_id).copied()
    }

    /// Attach the category a seeded professional is listed under, so the
    /// booking page does not have to guess it from specialty names.
    pub fn locate(&self, seed: BookingSeed) -> BookingSeed {
        if seed.category_id.is_some() {
            return seed;
        }
        let professional_id = seed
            .professional_id
            .or_else(|| seed.professional.as_ref().map(|p| p.id));
        match professional_id.and_then(|id| self.category_of(id)) {
            Some(category_id) => seed.with_category(category_id),
            None => seed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn context(&self) -> ChatContext<'_> {
        ChatContext {
            categories: &self.categories,
            professionals: &self.professionals,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rdv_client::ApiError;
    use rdv_core::models::{Availability, Booking, BookingRequest};

    struct FakeBackend;

    fn category(id: EntityId, name: &str) -> Category {
        Category {
            id,
            name: name.into(),
            description: None,
        }
    }

    fn professional(id: EntityId, last_name: &str, specialty: &str) -> Professional {
        Professional {
            id,
            first_name: "Jean".into(),
            last_name: last_name.into(),
            photo: None,
            tariff: None,
            specialties: vec![specialty.into()],
            description: None,
        }
    }

    #[async_trait]
    impl BookingBackend for FakeBackend {
        async fn categories(&self) -> Result<Vec<Category>, ApiError> {
            Ok(vec![
                category(1, "Informatique"),
                category(2, "Santé"),
                category(3, "Coaching"),
            ])
        }

        async fn professionals(&self, category_id: EntityId) -> Result<Vec<Professional>, ApiError> {
            match category_id {
                1 => Ok(vec![professional(42, "Dupont", "Réseaux")]),
                2 => Ok(vec![
                    professional(50, "Moreau", "Médecine générale"),
                    professional(42, "Dupont", "Réseaux"),
                ]),
                _ => Err(ApiError::ApiError {
                    status: 500,
                    body: String::new(),
                }),
            }
        }

        async fn availabilities(&self, _: EntityId) -> Result<Vec<Availability>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_booking(&self, _: &BookingRequest) -> Result<Option<Booking>, ApiError> {
            Ok(None)
        }

        async fn my_bookings(&self) -> Result<Vec<Booking>, ApiError> {
            Ok(Vec::new())
        }

        async fn cancel_booking(&self, _: EntityId) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete_booking(&self, _: EntityId) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_remembers_the_listing_category() {
        let catalog = Catalog::load(&FakeBackend).await.unwrap();

        assert_eq!(catalog.categories.len(), 3);
        assert_eq!(
            catalog.professionals.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![42, 50]
        );
        assert_eq!(catalog.category_of(42), Some(1));
        assert_eq!(catalog.category_of(50), Some(2));
        assert_eq!(catalog.category_of(7), None);
    }

    #[tokio::test]
    async fn locate_fills_in_the_category_of_a_professional_seed() {
        let catalog = Catalog::load(&FakeBackend).await.unwrap();

        let seed = catalog.locate(
            BookingSeed::for_professional(professional(42, "Dupont", "Réseaux"))
                .with_specialty("Réseaux"),
        );
        assert_eq!(seed.category_id, Some(1));
        assert_eq!(seed.match_category(&catalog.categories).map(|c| c.id), Some(1));

        let kept = catalog.locate(BookingSeed::for_specialty("Santé").with_category(2));
        assert_eq!(kept.category_id, Some(2));
        assert_eq!(catalog.locate(BookingSeed::for_specialty("Santé")).category_id, None);
    }
}
