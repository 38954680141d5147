//! Repository implementations for the Strata system tables.
//!
//! Repositories are static structs whose methods are generic over
//! `sea_orm::ConnectionTrait`, so the same call works on a pooled connection or
//! inside the transaction that wraps DDL plus history append.

pub mod backup;
pub mod form;
pub mod job;
pub mod migration;

// Re-export for easier access
pub use backup::BackupRepository;
pub use form::FormRepository;
pub use job::JobRepository;
pub use migration::MigrationRepository;
