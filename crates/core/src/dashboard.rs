//! User dashboard rules: splitting bookings into upcoming and past,
//! status counts, and which bookings may still be cancelled.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::models::{Booking, BookingStatus};
use crate::types::Timestamp;

/// Whether a booking can still be cancelled at `now`.
///
/// Only pending or confirmed bookings that have not started yet qualify.
pub fn can_cancel(booking: &Booking, now: Timestamp) -> bool {
    matches!(
        booking.status,
        BookingStatus::Pending | BookingStatus::Confirmed
    ) && booking.date > now
}

/// Validate a cancellation request against the booking's current state.
pub fn validate_cancellation(booking: &Booking, now: Timestamp) -> Result<(), CoreError> {
    if booking.date <= now {
        return Err(CoreError::Validation(format!(
            "Booking {} has already started and cannot be cancelled",
            booking.id
        )));
    }
    match booking.status {
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
        other => Err(CoreError::Validation(format!(
            "Cannot cancel booking {} with status '{}'",
            booking.id,
            other.as_str()
        ))),
    }
}

/// The dashboard's view of a user's bookings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Future, not cancelled, soonest first.
    pub upcoming: Vec<Booking>,
    /// Past or cancelled, most recent first.
    pub past: Vec<Booking>,
    pub counts: HashMap<BookingStatus, usize>,
}

impl DashboardSummary {
    /// Split and sort `bookings` relative to `now`.
    pub fn build(bookings: Vec<Booking>, now: Timestamp) -> Self {
        let mut counts: HashMap<BookingStatus, usize> = HashMap::new();
        for booking in &bookings {
            *counts.entry(booking.status).or_default() += 1;
        }

        let (mut upcoming, mut past): (Vec<Booking>, Vec<Booking>) = bookings
            .into_iter()
            .partition(|b| b.date > now && b.status != BookingStatus::Cancelled);

        upcoming.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        past.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        Self {
            upcoming,
            past,
            counts,
        }
    }

    pub fn count(&self, status: BookingStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.upcoming.len() + self.past.len()
    }

    /// The next booking the user will attend.
    pub fn next_booking(&self) -> Option<&Booking> {
        self.upcoming.first()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn booking(id: i64, hours_from_now: i64, status: BookingStatus) -> Booking {
        Booking {
            id,
            professional_id: Some(7),
            professional: None,
            date: now() + Duration::hours(hours_from_now),
            motif: "Contrôle".into(),
            status,
        }
    }

    #[test]
    fn can_cancel_only_future_pending_or_confirmed() {
        assert!(can_cancel(&booking(1, 2, BookingStatus::Pending), now()));
        assert!(can_cancel(&booking(2, 2, BookingStatus::Confirmed), now()));
        assert!(!can_cancel(&booking(3, 2, BookingStatus::Cancelled), now()));
        assert!(!can_cancel(&booking(4, 2, BookingStatus::Completed), now()));
        assert!(!can_cancel(&booking(5, -2, BookingStatus::Pending), now()));
        assert!(!can_cancel(&booking(6, 0, BookingStatus::Pending), now()));
    }

    #[test]
    fn validate_cancellation_messages() {
        assert!(validate_cancellation(&booking(1, 5, BookingStatus::Pending), now()).is_ok());
        assert!(validate_cancellation(&booking(1, -5, BookingStatus::Pending), now()).is_err());
        assert!(validate_cancellation(&booking(1, 5, BookingStatus::Completed), now()).is_err());
    }

    #[test]
    fn summary_splits_and_sorts() {
        let summary = DashboardSummary::build(
            vec![
                booking(1, 48, BookingStatus::Pending),
                booking(2, -24, BookingStatus::Completed),
                booking(3, 2, BookingStatus::Confirmed),
                booking(4, 10, BookingStatus::Cancelled),
                booking(5, -1, BookingStatus::Confirmed),
            ],
            now(),
        );

        let upcoming: Vec<i64> = summary.upcoming.iter().map(|b| b.id).collect();
        let past: Vec<i64> = summary.past.iter().map(|b| b.id).collect();
        assert_eq!(upcoming, vec![3, 1]);
        assert_eq!(past, vec![4, 5, 2]);
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.next_booking().map(|b| b.id), Some(3));
        assert_eq!(summary.count(BookingStatus::Confirmed), 2);
        assert_eq!(summary.count(BookingStatus::Cancelled), 1);
    }

    #[test]
    fn empty_summary() {
        let summary = DashboardSummary::build(Vec::new(), now());
        assert_eq!(summary.total(), 0);
        assert!(summary.next_booking().is_none());
        assert_eq!(summary.count(BookingStatus::Pending), 0);
    }
}
