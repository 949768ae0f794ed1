//! User dashboard controller: the signed-in user's bookings.
//!
//! The list is reloaded on demand and whenever a booking event seen on the
//! bus makes it stale (a booking created from the booking page, say).

use std::sync::Arc;

use rdv_core::dashboard::{validate_cancellation, DashboardSummary};
use rdv_core::error::CoreError;
use rdv_core::models::Booking;
use rdv_core::types::{EntityId, Timestamp};
use rdv_events::bus::{BookingEvent, EventBus, BOOKING_CANCELLED, BOOKING_DELETED};
use tokio::sync::broadcast;

use crate::backend::BookingBackend;
use crate::error::{AppError, AppResult};

pub struct Dashboard {
    backend: Arc<dyn BookingBackend>,
    bus: Option<Arc<EventBus>>,
    events: Option<broadcast::Receiver<BookingEvent>>,
    summary: Option<DashboardSummary>,
    error: Option<String>,
    stale: bool,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn BookingBackend>) -> Self {
        Self {
            backend,
            bus: None,
            events: None,
            summary: None,
            error: None,
            stale: true,
        }
    }

    /// Publish cancellations and deletions on `bus` and watch it for
    /// changes made elsewhere.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus.subscribe());
        self.bus = Some(bus);
        self
    }

    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    /// Error of the last load, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the list must be reloaded before being shown.
    pub fn is_stale(&mut self) -> bool {
        self.drain_events();
        self.stale
    }

    fn drain_events(&mut self) {
        let Some(rx) = self.events.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    tracing::debug!(event_type = %event.event_type, "Dashboard marked stale");
                    self.stale = true;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dashboard lagged behind booking events");
                    self.stale = true;
                }
                Err(_) => break,
            }
        }
    }

    /// Reload the bookings from the backend.
    pub async fn refresh(&mut self, now: Timestamp) -> AppResult<&DashboardSummary> {
        match self.backend.my_bookings().await {
            Ok(bookings) => {
                tracing::debug!(count = bookings.len(), "Bookings loaded");
                self.error = None;
                self.stale = false;
                // Our own events are already accounted for.
                self.drain_events();
                self.stale = false;
                Ok(self.summary.insert(DashboardSummary::build(bookings, now)))
            }
            Err(e) => {
                let err = AppError::from(e);
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// The summary, reloaded first when stale or never loaded.
    pub async fn show(&mut self, now: Timestamp) -> AppResult<&DashboardSummary> {
        if self.is_stale() || self.summary.is_none() {
            return self.refresh(now).await;
        }
        self.summary
            .as_ref()
            .ok_or_else(|| CoreError::Internal("Dashboard summary missing".into()).into())
    }

    fn find(&self, booking_id: EntityId) -> AppResult<&Booking> {
        self.summary
            .as_ref()
            .and_then(|s| s.upcoming.iter().chain(&s.past).find(|b| b.id == booking_id))
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "booking",
                    id: booking_id,
                }
                .into()
            })
    }

    /// Cancel an upcoming booking, then reload.
    pub async fn cancel(&mut self, booking_id: EntityId, now: Timestamp) -> AppResult<()> {
        let booking = self.find(booking_id)?;
        validate_cancellation(booking, now)?;
        let professional_id = booking.professional_id;

        self.backend.cancel_booking(booking_id).await?;
        tracing::info!(booking_id, "Booking cancelled");
        self.publish(BOOKING_CANCELLED, booking_id, professional_id);
        self.refresh(now).await?;
        Ok(())
    }

    /// Delete a booking from the user's history, then reload.
    pub async fn delete(&mut self, booking_id: EntityId, now: Timestamp) -> AppResult<()> {
        let professional_id = self.find(booking_id)?.professional_id;

        self.backend.delete_booking(booking_id).await?;
        tracing::info!(booking_id, "Booking deleted");
        self.publish(BOOKING_DELETED, booking_id, professional_id);
        self.refresh(now).await?;
        Ok(())
    }

    fn publish(&self, event_type: &str, booking_id: EntityId, professional_id: Option<EntityId>) {
        let Some(bus) = &self.bus else {
            return;
        };
        let mut event = BookingEvent::new(event_type).with_booking(booking_id);
        if let Some(professional_id) = professional_id {
            event = event.with_professional(professional_id);
        }
        bus.publish(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use rdv_client::ApiError;
    use rdv_core::models::{
        Availability, BookingRequest, BookingStatus, Category, Professional,
    };
    use rdv_events::bus::BOOKING_CREATED;

    struct FakeBackend {
        bookings: Mutex<Vec<Booking>>,
        loads: Mutex<usize>,
    }

    #[async_trait]
    impl BookingBackend for FakeBackend {
        async fn categories(&self) -> Result<Vec<Category>, ApiError> {
            Ok(Vec::new())
        }

        async fn professionals(&self, _: EntityId) -> Result<Vec<Professional>, ApiError> {
            Ok(Vec::new())
        }

        async fn availabilities(&self, _: EntityId) -> Result<Vec<Availability>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_booking(
            &self,
            _: &BookingRequest,
        ) -> Result<Option<Booking>, ApiError> {
            Ok(None)
        }

        async fn my_bookings(&self) -> Result<Vec<Booking>, ApiError> {
            *self.loads.lock().unwrap() += 1;
            Ok(self.bookings.lock().unwrap().clone())
        }

        async fn cancel_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
            let mut bookings = self.bookings.lock().unwrap();
            match bookings.iter_mut().find(|b| b.id == booking_id) {
                Some(b) => {
                    b.status = BookingStatus::Cancelled;
                    Ok(())
                }
                None => Err(ApiError::ApiError {
                    status: 404,
                    body: String::new(),
                }),
            }
        }

        async fn delete_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
            self.bookings.lock().unwrap().retain(|b| b.id != booking_id);
            Ok(())
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn booking(id: EntityId, hours: i64, status: BookingStatus) -> Booking {
        Booking {
            id,
            professional_id: Some(42),
            professional: None,
            date: now() + Duration::hours(hours),
            motif: "Suivi".into(),
            status,
        }
    }

    fn backend() -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            bookings: Mutex::new(vec![
                booking(1, 24, BookingStatus::Pending),
                booking(2, -24, BookingStatus::Completed),
            ]),
            loads: Mutex::new(0),
        })
    }

    #[tokio::test]
    async fn cancel_publishes_and_reloads() {
        let backend = backend();
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut dashboard = Dashboard::new(Arc::clone(&backend) as Arc<dyn BookingBackend>)
            .with_events(Arc::clone(&bus));

        dashboard.refresh(now()).await.unwrap();
        dashboard.cancel(1, now()).await.unwrap();

        let summary = dashboard.summary().unwrap();
        assert!(summary.upcoming.is_empty());
        assert_eq!(summary.count(BookingStatus::Cancelled), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, BOOKING_CANCELLED);
        assert_eq!(event.booking_id, Some(1));
        assert!(!dashboard.is_stale());
    }

    #[tokio::test]
    async fn past_booking_cannot_be_cancelled() {
        let backend = backend();
        let mut dashboard = Dashboard::new(Arc::clone(&backend) as Arc<dyn BookingBackend>);
        dashboard.refresh(now()).await.unwrap();

        assert_matches!(
            dashboard.cancel(2, now()).await,
            Err(AppError::Core(CoreError::Validation(_)))
        );
        assert_matches!(
            dashboard.cancel(7, now()).await,
            Err(AppError::Core(CoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn delete_removes_booking() {
        let backend = backend();
        let mut dashboard = Dashboard::new(Arc::clone(&backend) as Arc<dyn BookingBackend>);
        dashboard.refresh(now()).await.unwrap();
        dashboard.delete(2, now()).await.unwrap();
        assert_eq!(dashboard.summary().unwrap().total(), 1);
    }

    #[tokio::test]
    async fn external_event_makes_the_list_stale() {
        let backend = backend();
        let bus = Arc::new(EventBus::default());
        let mut dashboard = Dashboard::new(Arc::clone(&backend) as Arc<dyn BookingBackend>)
            .with_events(Arc::clone(&bus));

        dashboard.show(now()).await.unwrap();
        dashboard.show(now()).await.unwrap();
        assert_eq!(*backend.loads.lock().unwrap(), 1);

        bus.publish(BookingEvent::new(BOOKING_CREATED).with_booking(3));
        assert!(dashboard.is_stale());
        dashboard.show(now()).await.unwrap();
        assert_eq!(*backend.loads.lock().unwrap(), 2);
    }
}
