//! SeaORM entities for the Strata system.
//!
//! This module contains the SeaORM entity definitions for the system's own tables:
//! form schemas, the append-only migration history, column backups, and queue jobs.
//! The dynamic per-form tables are intentionally *not* modeled as entities; their
//! column set is runtime data and they are only touched through the schema driver.

pub mod column_backup;
pub mod field_migration;
pub mod form;
pub mod migration_job;
pub mod prelude;
