//! Booking seed handoff between the widgets and the booking page.
//!
//! Producers (chat widget, search box) publish through a [`SeedOutbox`];
//! the booking page reads through a [`SeedInbox`]. Every published seed is
//! also written to client storage under the `selectedBooking*` keys so a
//! seed handed off just before the process exits is picked up on the next
//! start. Reading a seed removes the persisted copy.

use std::sync::Arc;

use rdv_client::Storage;
use rdv_core::handoff::{
    BookingSeed, STORAGE_KEY_CATEGORY, STORAGE_KEY_PROFESSIONAL, STORAGE_KEY_SPECIALTY,
};
use rdv_events::{SeedReceiver, SeedSender};

use crate::error::AppResult;

/// Create a connected outbox/inbox pair backed by `storage`.
pub fn seed_handoff(storage: Arc<dyn Storage>) -> (SeedOutbox, SeedInbox) {
    let (sender, receiver) = rdv_events::channel();
    (
        SeedOutbox {
            sender,
            storage: Arc::clone(&storage),
        },
        SeedInbox { receiver, storage },
    )
}

/// Write side, shared by every producer.
pub struct SeedOutbox {
    sender: SeedSender,
    storage: Arc<dyn Storage>,
}

impl SeedOutbox {
    /// Persist `seed` and hand it to the booking page. Empty seeds are
    /// ignored.
    pub fn publish(&self, seed: BookingSeed) -> AppResult<()> {
        if seed.is_empty() {
            return Ok(());
        }
        persist_seed(self.storage.as_ref(), &seed)?;
        self.sender.send(seed);
        Ok(())
    }
}

/// Read side, owned by the booking page's driver.
pub struct SeedInbox {
    receiver: SeedReceiver,
    storage: Arc<dyn Storage>,
}

impl SeedInbox {
    /// Take the seed published in this session, if any.
    pub fn take(&self) -> AppResult<Option<BookingSeed>> {
        match self.receiver.take() {
            Some(seed) => {
                clear_seed(self.storage.as_ref())?;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }

    /// Take the seed left in storage by a previous session, if any.
    pub fn take_persisted(&self) -> AppResult<Option<BookingSeed>> {
        take_persisted_seed(self.storage.as_ref())
    }

    /// Wait for the next published seed.
    pub async fn recv(&self) -> AppResult<Option<BookingSeed>> {
        match self.receiver.recv().await {
            Some(seed) => {
                clear_seed(self.storage.as_ref())?;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }
}

/// Write `seed` to storage, replacing any unread one.
pub fn persist_seed(storage: &dyn Storage, seed: &BookingSeed) -> AppResult<()> {
    clear_seed(storage)?;
    for (key, value) in seed.to_storage_entries() {
        storage.set(key, &value)?;
    }
    Ok(())
}

/// Read the persisted seed and remove it from storage.
pub fn take_persisted_seed(storage: &dyn Storage) -> AppResult<Option<BookingSeed>> {
    let seed = BookingSeed::from_storage_entries(|key| storage.get(key));
    if seed.is_empty() {
        return Ok(None);
    }
    clear_seed(storage)?;
    tracing::debug!(specialty = ?seed.specialty, professional_id = ?seed.professional_id, "Read persisted booking seed");
    Ok(Some(seed))
}

/// Remove any persisted seed.
pub fn clear_seed(storage: &dyn Storage) -> AppResult<()> {
    storage.remove(STORAGE_KEY_SPECIALTY)?;
    storage.remove(STORAGE_KEY_CATEGORY)?;
    storage.remove(STORAGE_KEY_PROFESSIONAL)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
