//! # Classbook Core
//!
//! Domain layer of the tutoring platform's availability and rebooking engine.
//!
//! - [`slots`] expands versioned weekly schedules into bookable instants
//! - [`absence`] plans per-item absence changes for batch updates
//! - [`conflict`] detects hard and soft booking conflicts
//! - [`rebooking`] owns the cancellation credit state machine
//! - [`versioning`] closes and opens instructor schedule versions
//! - [`recurring`] validates edits to weekly recurring classes
//! - [`service`] runs every operation as one unit of work against a [`store::Store`]

pub mod absence;
pub mod clock;
pub mod conflict;
pub mod errors;
pub mod models;
pub mod notify;
pub mod policy;
pub mod rebooking;
pub mod recurring;
pub mod service;
pub mod slots;
pub mod store;
pub mod versioning;
