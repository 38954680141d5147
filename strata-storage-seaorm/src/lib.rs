//! # Strata Storage SeaORM
//!
//! `strata-storage-seaorm` provides SeaORM-based persistence for the Strata field
//! migration system: the entities and repositories for forms, migration history,
//! column backups, and queue jobs, plus the schema driver that executes primitive
//! DDL against the dynamic per-form tables.
//!
//! The driver is the only place raw SQL touches a dynamic table. Every identifier it
//! interpolates has passed `strata_core::ident` validation and is double-quoted; all
//! values travel as bind parameters.

#![warn(missing_docs)]

pub mod entities;
pub mod repo;
pub mod schema_driver;

// Re-exported so downstream crates share one sea-orm version.
pub use sea_orm;
