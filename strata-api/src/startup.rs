//! This module handles the application startup process for the Strata API.
//!
//! It includes logic for connecting to the database, running the system's own
//! migrations, building the Axum application, spawning the queue workers and the
//! backup retention sweeper, and starting the HTTP server.
use tokio::net::TcpListener;

use crate::handlers;
use crate::{error::BuildError, state::AppState};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use strata_config::settings_parser::Settings;
use strata_migration::{Migrator, MigratorTrait};
use tower_http::trace::TraceLayer;

/// Represents the Strata API application, encapsulating the server's network
/// listener, application-wide state, and the port it is bound to.
pub struct Application {
    listener: TcpListener,
    state: AppState,
    port: u16,
}

impl Application {
    /// Builds a new `Application` instance by connecting to the database,
    /// running pending system migrations, and setting up the TCP listener.
    ///
    /// # Arguments
    /// * `config` - The application settings loaded from configuration.
    ///
    /// # Returns
    /// A `Result` which is `Ok` with the `Application` instance if successful,
    /// or `Err` with a `BuildError` if any step fails.
    pub async fn build(config: Settings) -> Result<Self, BuildError> {
        // Connect to Database
        let db: DatabaseConnection = Self::get_db_connection(&config).await?;
        tracing::info!("Connected to database: {}", &config.database.database_name);

        // Run the system's own migrations (forms, history, backups, jobs)
        Self::run_migrations(&db).await?;

        let state = AppState::new(db, &config);
        let addr = format!("{}:{}", config.application.host, config.application.port);
        tracing::info!("Listening on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        // Return Application
        Ok(Self {
            listener,
            state,
            port,
        })
    }

    // This is useful because when the port in config is 0, a random port will be
    // assigned which we need to know post hoc.
    /// Port number getter
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Establishes a database connection using the provided application settings.
    async fn get_db_connection(config: &Settings) -> Result<DatabaseConnection, DbErr> {
        Database::connect(config.database.get_connect_options()).await
    }

    /// Runs any pending system migrations.
    async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
        tracing::info!("Running system migrations...");
        Migrator::up(db, None).await?;
        tracing::info!("Migrations applied successfully.");
        Ok(())
    }

    /// Creates the Axum router with all routes and state attached.
    fn define_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(|| async { StatusCode::OK }))
            .route("/forms", post(handlers::create_form))
            .route("/forms/{id}", get(handlers::get_form))
            .route("/forms/{id}/migrations/preview", post(handlers::preview_migrations))
            .route("/forms/{id}/migrations/apply", post(handlers::apply_migrations))
            .route("/forms/{id}/migrations", get(handlers::migration_history))
            .route("/migrations/{id}/rollback", post(handlers::rollback_migration))
            .route(
                "/forms/{id}/backups",
                get(handlers::list_backups).post(handlers::create_backup),
            )
            .route("/backups/{id}/restore", post(handlers::restore_backup))
            .route("/queue/status", get(handlers::queue_status))
            .route("/forms/{id}/jobs", get(handlers::queue_metrics))
            .route("/jobs/{id}/cancel", post(handlers::cancel_job))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Spawns the queue workers and the backup retention sweeper, then serves the
    /// API until the process exits.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let Application {
            listener,
            state,
            port: _,
        } = self;

        // Workers recover stranded jobs before accepting claims.
        let _worker_handles = state.queue.start_workers().await;

        // Periodic sweep of expired backups.
        let engine = Arc::clone(&state.engine);
        let sweep_interval = state.backup_sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = engine.backups().sweep_expired().await {
                    tracing::error!(error = %err, "backup retention sweep failed");
                }
            }
        });

        let router = Self::define_router(state);
        axum::serve(listener, router.into_make_service()).await
    }
}
