//! # Strata Core
//!
//! `strata-core` provides the foundational domain models, traits, and types for the Strata
//! field migration system. A Strata form owns one dynamic SQL table; when the form's field
//! list is edited, this crate supplies the pure building blocks the rest of the system
//! executes: logical field types and their physical column mapping, deterministic SQL
//! identifier derivation, change detection between two field lists, migration/backup/job
//! records, the type-conversion policy, the event vocabulary, and the role matrix.
//!
//! Everything in this crate is synchronous and database-free by design. Identifier
//! resolution in particular is pure and pre-computed before any transaction opens.

#![warn(missing_docs)]

pub mod auth;
pub mod convert;
pub mod event;
pub mod field;
pub mod form;
pub mod ident;
pub mod job;
pub mod physical;
pub mod plan;
pub mod record;

pub use auth::{Operation, Role};
pub use convert::{ConversionCheck, ConversionRule};
pub use event::{EventSink, LogSink, MigrationEvent};
pub use field::{FieldDescriptor, FieldSpec, FieldType};
pub use form::FormSchema;
pub use ident::IdentError;
pub use job::{JobState, MigrationJob, QueueCounts};
pub use physical::PhysicalType;
pub use plan::{MigrationOp, QueuedOp, detect_changes};
pub use record::{BackupKind, ColumnBackup, MigrationKind, MigrationRecord, SnapshotRow};
