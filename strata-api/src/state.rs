//! Defines the shared application state for the Strata API.
//!
//! This module provides the `AppState` struct, which holds common resources
//! such as the database connection, the migration engine, the queue, and the
//! service clients, making them accessible to all request handlers.
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use strata_config::settings_parser::Settings;
use strata_core::event::LogSink;
use strata_engine::MigrationEngine;
use strata_queue::{MigrationQueue, QueueSettings};
use strata_service::{FormService, MigrationService};

/// The shared state accessible by all request handlers.
/// We wrap the heavy members in Arc for cheap cloning across threads.
#[derive(Clone)]
pub struct AppState {
    /// Database Connection
    pub db: DatabaseConnection,
    /// Smart pointer to the migration engine
    pub engine: Arc<MigrationEngine>,
    /// Smart pointer to the migration queue
    pub queue: Arc<MigrationQueue>,
    /// Smart pointer to the form orchestration service
    pub form_service: Arc<FormService>,
    /// Smart pointer to the migration orchestration service
    pub migration_service: Arc<MigrationService>,
    /// Interval between expired-backup sweeps
    pub backup_sweep_interval: Duration,
}

impl AppState {
    /// Creates a new instance of `AppState`, wiring the engine, queue, and
    /// services onto the provided database connection.
    ///
    /// # Arguments
    /// * `db` - A `DatabaseConnection` shared by every component.
    /// * `config` - Application settings (queue and retention tuning).
    pub fn new(db: DatabaseConnection, config: &Settings) -> Self {
        let engine = Arc::new(
            MigrationEngine::new(db.clone())
                .with_backup_retention_days(config.retention.backup_ttl_days),
        );

        let queue_settings = QueueSettings {
            workers: config.queue.workers,
            poll_interval: Duration::from_millis(config.queue.poll_interval_ms),
            visibility_timeout: Duration::from_secs(config.queue.visibility_timeout_secs),
            ..QueueSettings::default()
        };
        let queue = Arc::new(MigrationQueue::new(
            db.clone(),
            Arc::clone(&engine),
            Arc::new(LogSink),
            queue_settings,
        ));

        let form_service = FormService::new(db.clone(), Arc::clone(&engine));
        let migration_service =
            MigrationService::new(db.clone(), Arc::clone(&engine), Arc::clone(&queue));

        Self {
            db,
            engine,
            queue,
            form_service: Arc::new(form_service),
            migration_service: Arc::new(migration_service),
            backup_sweep_interval: Duration::from_secs(config.retention.sweep_interval_secs),
        }
    }
}
