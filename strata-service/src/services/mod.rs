//! This module serves as a re-export module for the services within the
//! `strata-service` crate.

pub mod form;
pub mod migration;

pub use form::FormService;
pub use migration::{Caller, MigrationService};
