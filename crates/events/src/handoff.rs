//! Single-producer / single-consumer handoff of a [`BookingSeed`].
//!
//! The producer (chat or search widget) writes a seed; the consumer (the
//! booking page) reads it once and it is gone. Writes overwrite an unread
//! seed (last write wins) and wake a waiting consumer.

use std::sync::{Arc, Mutex};

use rdv_core::handoff::BookingSeed;
use tokio::sync::Notify;

struct Shared {
    slot: Mutex<SlotState>,
    notify: Notify,
}

#[derive(Default)]
struct SlotState {
    seed: Option<BookingSeed>,
    closed: bool,
}

/// Write half of the handoff channel.
pub struct SeedSender {
    shared: Arc<Shared>,
}

/// Read half of the handoff channel.
pub struct SeedReceiver {
    shared: Arc<Shared>,
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (SeedSender, SeedReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(SlotState::default()),
        notify: Notify::new(),
    });
    (
        SeedSender {
            shared: Arc::clone(&shared),
        },
        SeedReceiver { shared },
    )
}

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, SlotState> {
    // The slot holds plain data; a poisoned lock still has a usable value.
    shared.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SeedSender {
    /// Publish a seed, replacing any unread one. Empty seeds are ignored.
    pub fn send(&self, seed: BookingSeed) {
        if seed.is_empty() {
            tracing::debug!("Ignoring empty booking seed");
            return;
        }
        let replaced = lock(&self.shared).seed.replace(seed).is_some();
        tracing::debug!(replaced, "Booking seed handed off");
        self.shared.notify.notify_one();
    }
}

impl Drop for SeedSender {
    fn drop(&mut self) {
        lock(&self.shared).closed = true;
        self.shared.notify.notify_one();
    }
}

impl SeedReceiver {
    /// Take the pending seed, if any, without waiting.
    pub fn take(&self) -> Option<BookingSeed> {
        lock(&self.shared).seed.take()
    }

    /// Whether a seed is waiting.
    pub fn has_pending(&self) -> bool {
        lock(&self.shared).seed.is_some()
    }

    /// Wait for the next seed and take it.
    ///
    /// Returns `None` once the sender is dropped and no seed is pending.
    pub async fn recv(&self) -> Option<BookingSeed> {
        loop {
            {
                let mut state = lock(&self.shared);
                if let Some(seed) = state.seed.take() {
                    return Some(seed);
                }
                if state.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn take_reads_once() {
        let (tx, rx) = channel();
        tx.send(BookingSeed::for_specialty("Santé"));
        assert!(rx.has_pending());
        assert_eq!(
            rx.take().and_then(|s| s.specialty).as_deref(),
            Some("Santé")
        );
        assert!(rx.take().is_none());
    }

    #[test]
    fn last_write_wins() {
        let (tx, rx) = channel();
        tx.send(BookingSeed::for_specialty("Santé"));
        tx.send(BookingSeed::for_specialty("Informatique"));
        assert_eq!(
            rx.take().and_then(|s| s.specialty).as_deref(),
            Some("Informatique")
        );
    }

    #[test]
    fn empty_seed_is_ignored() {
        let (tx, rx) = channel();
        tx.send(BookingSeed::default());
        assert!(!rx.has_pending());
    }

    #[tokio::test]
    async fn recv_wakes_on_send() {
        let (tx, rx) = channel();
        let waiter = tokio::spawn(async move { rx.recv().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(BookingSeed::for_specialty("Sport"));

        let seed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver should wake")
            .expect("task should not panic");
        assert_eq!(seed.and_then(|s| s.specialty).as_deref(), Some("Sport"));
    }

    #[tokio::test]
    async fn recv_returns_none_after_sender_drop() {
        let (tx, rx) = channel();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn pending_seed_survives_sender_drop() {
        let (tx, rx) = channel();
        tx.send(BookingSeed::for_specialty("Santé"));
        drop(tx);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
