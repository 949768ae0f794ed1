//! Domain logic for the rendez-vous booking client.
//!
//! This crate has zero internal deps and performs no I/O, so every rule
//! here (wizard transitions, slot grouping, chat and search heuristics,
//! dashboard partitioning) can be exercised from plain unit tests and
//! reused by the REST client, the controllers, and the terminal front-end.

pub mod availability;
pub mod booking_workflow;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod handoff;
pub mod models;
pub mod motif;
pub mod search;
pub mod text;
pub mod types;
