//! # Strata Service
//!
//! `strata-service` is the orchestration layer of the Strata field migration system.
//! It exposes the system's public operations — preview, apply, history, rollback,
//! backup listing, restore, and queue status — behind a single authorization
//! predicate, and coordinates the form store, migration engine, and queue.

#![warn(missing_docs)]

pub mod error;
pub mod services;

pub use error::ServiceError;
pub use services::{Caller, FormService, MigrationService};
