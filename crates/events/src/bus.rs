//! Booking notifications shared between the screens of one session.
//!
//! The booking page announces a confirmed appointment and the dashboard
//! announces its cancellations and deletions. Every screen holding a
//! receiver learns about the change and refreshes what it shows. One
//! [`EventBus`] lives per session, behind an `Arc`.

use chrono::{DateTime, Utc};
use rdv_core::types::EntityId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BookingEvent
// ---------------------------------------------------------------------------

/// The backend accepted a new appointment.
pub const BOOKING_CREATED: &str = "booking.created";

/// An appointment moved to `CANCELLED`.
pub const BOOKING_CANCELLED: &str = "booking.cancelled";

/// An appointment was removed from the user's list.
pub const BOOKING_DELETED: &str = "booking.deleted";

/// A change to one of the user's appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// One of [`BOOKING_CREATED`], [`BOOKING_CANCELLED`] or [`BOOKING_DELETED`].
    pub event_type: String,

    /// Absent when the backend answered a creation with an empty body.
    pub booking_id: Option<EntityId>,

    pub professional_id: Option<EntityId>,

    /// Slot date and motif of a new appointment. `{}` otherwise.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            booking_id: None,
            professional_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_booking(mut self, booking_id: EntityId) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn with_professional(mut self, professional_id: EntityId) -> Self {
        self.professional_id = Some(professional_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Events kept for a receiver that has not drained its queue yet.
const DEFAULT_CAPACITY: usize = 64;

/// Broadcasts [`BookingEvent`]s to every screen of the session.
///
/// ```rust
/// use rdv_events::bus::{BookingEvent, EventBus, BOOKING_CANCELLED};
///
/// let bus = EventBus::default();
/// let mut dashboard = bus.subscribe();
///
/// bus.publish(BookingEvent::new(BOOKING_CANCELLED).with_booking(12));
/// assert_eq!(dashboard.try_recv().unwrap().booking_id, Some(12));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    /// A receiver more than `capacity` events behind gets
    /// `RecvError::Lagged` and skips to the oldest event still queued.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Events published while no screen listens are lost.
    pub fn publish(&self, event: BookingEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            booking_id = ?event.booking_id,
            "Publishing booking event"
        );
        // Err only when no receiver exists.
        let _ = self.sender.send(event);
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[tokio::test]
    async fn confirmed_booking_reaches_the_dashboard() {
        let bus = EventBus::default();
        let mut dashboard = bus.subscribe();

        bus.publish(
            BookingEvent::new(BOOKING_CREATED)
                .with_booking(500)
                .with_professional(42)
                .with_payload(serde_json::json!({
                    "date": "2024-06-10T09:00:00.000Z",
                    "motif": "Révision",
                })),
        );

        let event = dashboard.recv().await.unwrap();
        assert_eq!(event.event_type, BOOKING_CREATED);
        assert_eq!(event.booking_id, Some(500));
        assert_eq!(event.professional_id, Some(42));
        assert_eq!(event.payload["motif"], "Révision");
    }

    #[tokio::test]
    async fn every_screen_sees_a_cancellation() {
        let bus = EventBus::default();
        let mut dashboard = bus.subscribe();
        let mut booking_page = bus.subscribe();

        bus.publish(BookingEvent::new(BOOKING_CANCELLED).with_booking(7));

        assert_eq!(dashboard.recv().await.unwrap().booking_id, Some(7));
        assert_eq!(booking_page.recv().await.unwrap().booking_id, Some(7));
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.publish(BookingEvent::new(BOOKING_DELETED).with_booking(3));

        let mut dashboard = bus.subscribe();
        assert_matches!(dashboard.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn slow_receiver_is_told_it_lagged() {
        let bus = EventBus::new(2);
        let mut dashboard = bus.subscribe();

        for id in 1..=3 {
            bus.publish(BookingEvent::new(BOOKING_DELETED).with_booking(id));
        }

        assert_matches!(dashboard.recv().await, Err(RecvError::Lagged(1)));
        assert_eq!(dashboard.recv().await.unwrap().booking_id, Some(2));
    }

    #[test]
    fn cancellation_has_an_empty_payload() {
        let event = BookingEvent::new(BOOKING_CANCELLED).with_booking(9);
        assert!(event.professional_id.is_none());
        assert_eq!(event.payload, serde_json::json!({}));
    }
}
