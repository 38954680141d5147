//! # Strata
//!
//! `strata` keeps a user-editable form schema in lockstep with a per-form dynamic
//! SQL table while preserving every row of existing data. This crate provides a
//! convenient entry point with re-exports from the core Strata crates.
//!
//! For most users, this is the crate you want to add to your dependencies.
//!
//! ## Architecture
//!
//! Strata is composed of several focused crates:
//! - `strata-core` - Domain models, identifier normalization, and migration planning
//! - `strata-storage-seaorm` - SeaORM persistence and the dynamic-table schema driver
//! - `strata-engine` - Migration execution, history, and the backup store
//! - `strata-queue` - Per-form serialized job queue and worker pool
//! - `strata-service` - Orchestration and the role gate
//! - `strata-config` - Configuration parsing
//! - `strata-api` - Web API (Axum)

#![warn(missing_docs)]

// Re-export the most commonly used types
pub use strata_core::{
    FieldDescriptor, FieldSpec, FieldType, FormSchema, MigrationOp, PhysicalType, QueuedOp,
    detect_changes,
};
pub use strata_engine::{BackupStore, MigrationEngine, MigrationPreview};
pub use strata_queue::{MigrationQueue, QueueSettings};
pub use strata_service::{Caller, FormService, MigrationService, ServiceError};

/// Configuration parsing, re-exported for binary crates.
pub mod config {
    pub use strata_config::*;
}

/// Storage entities, repositories, and the schema driver, for advanced users.
pub mod storage {
    pub use strata_storage_seaorm::*;
}
