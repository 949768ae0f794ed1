//! The seam between the controllers and the REST backend.
//!
//! Controllers hold an `Arc<dyn BookingBackend>`; production wires in
//! [`BookingApi`], tests substitute in-memory fakes.

use async_trait::async_trait;
use rdv_client::{ApiError, BookingApi};
use rdv_core::models::{Availability, Booking, BookingRequest, Category, Professional};
use rdv_core::types::EntityId;

/// Backend operations the client depends on.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;

    async fn professionals(&self, category_id: EntityId) -> Result<Vec<Professional>, ApiError>;

    /// Open slots only.
    async fn availabilities(
        &self,
        professional_id: EntityId,
    ) -> Result<Vec<Availability>, ApiError>;

    async fn create_booking(&self, request: &BookingRequest)
        -> Result<Option<Booking>, ApiError>;

    async fn my_bookings(&self) -> Result<Vec<Booking>, ApiError>;

    async fn cancel_booking(&self, booking_id: EntityId) -> Result<(), ApiError>;

    async fn delete_booking(&self, booking_id: EntityId) -> Result<(), ApiError>;
}

#[async_trait]
impl BookingBackend for BookingApi {
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.list_categories().await
    }

    async fn professionals(&self, category_id: EntityId) -> Result<Vec<Professional>, ApiError> {
        self.list_professionals(category_id).await
    }

    async fn availabilities(
        &self,
        professional_id: EntityId,
    ) -> Result<Vec<Availability>, ApiError> {
        self.list_availabilities(professional_id).await
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<Option<Booking>, ApiError> {
        BookingApi::create_booking(self, request).await
    }

    async fn my_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.list_my_bookings().await
    }

    async fn cancel_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
        BookingApi::cancel_booking(self, booking_id).await
    }

    async fn delete_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
        BookingApi::delete_booking(self, booking_id).await
    }
}
