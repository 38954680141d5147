//! # Strata API
//!
//! `strata-api` is the web interface for the Strata field migration system. This
//! crate provides Axum-based REST endpoints for previewing and applying form schema
//! changes, inspecting migration history, rolling back, managing column backups,
//! and observing the migration queue.

#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod startup;
pub mod state;
pub mod telemetry;
