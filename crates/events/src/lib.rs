//! In-process messaging for the booking client.
//!
//! - [`handoff`]: single-producer / single-consumer channel carrying a
//!   [`BookingSeed`](rdv_core::handoff::BookingSeed) from the chat and
//!   search widgets to the booking page.
//! - [`bus`]: publish/subscribe hub for [`BookingEvent`]s (booking
//!   created, cancelled, deleted) backed by `tokio::sync::broadcast`.

pub mod bus;
pub mod handoff;

pub use bus::{BookingEvent, EventBus};
pub use handoff::{channel, SeedReceiver, SeedSender};
