//! REST client for the booking backend.
//!
//! Provides the typed HTTP wrappers over the backend endpoints
//! ([`api::BookingApi`]) and the persisted client storage the bearer
//! token is read from ([`storage`]).

pub mod api;
pub mod storage;

pub use api::{ApiError, BookingApi};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, AUTH_TOKEN_KEY};
