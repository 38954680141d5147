//! # Strata Engine
//!
//! `strata-engine` plans, validates, previews, and applies single column migrations
//! against a form's dynamic table, writes the append-only history, and owns the
//! backup store used before destructive changes.
//!
//! The engine's transactional contract: DDL and the history append share one
//! transaction; backups for destructive ops commit *before* the DDL transaction
//! begins (so a DDL failure never destroys the backup); failed attempts are recorded
//! in a separate short transaction after the DDL transaction has rolled back.

#![warn(missing_docs)]

pub mod backup;
pub mod engine;
pub mod error;
pub mod preview;
pub mod rollback;
pub mod sql;

pub use backup::BackupStore;
pub use engine::{MigrationContext, MigrationEngine};
pub use error::EngineError;
pub use preview::MigrationPreview;
