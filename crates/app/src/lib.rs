//! Booking client orchestration.
//!
//! Controllers for the booking page, the chat widget, the search box and
//! the user dashboard, wired to the REST backend through the
//! [`backend::BookingBackend`] trait, plus configuration, error mapping
//! and the terminal front-end used by the `rdv-app` binary.

pub mod backend;
pub mod booking_page;
pub mod catalog;
pub mod chat_widget;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod handoff;
pub mod search_box;
pub mod terminal;
