/// Runtime configuration parser

use crate::ConfigError;
use sea_orm::ConnectOptions;
use secrecy::{ExposeSecret, SecretString};
use serde_aux::field_attributes::deserialize_number_from_string;


/// Structure for all config settings
#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    /// Config settings for the API
    pub application: AppSettings,
    /// Config settings for the database
    pub database: DatabaseSettings,
    /// Config settings for the migration queue workers
    #[serde(default)]
    pub queue: QueueConfig,
    /// Config settings for backup retention
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(serde::Deserialize, Clone)]
pub struct AppSettings {
    /// API host
    pub host: String,
    /// API port
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// Config struct to parse and store database configuration
#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Database management system (current options: Postgres)
    pub dbms: String,
    /// Database username
    pub user: String,
    /// Database password
    pub password: SecretString,
    /// Database port
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    /// Database host address
    pub host: String,
    /// Database name
    pub database_name: String
}

/// Tuning for the migration queue worker pool.
#[derive(serde::Deserialize, Clone)]
pub struct QueueConfig {
    /// Number of worker tasks.
    #[serde(
        deserialize_with = "deserialize_number_from_string",
        default = "default_workers"
    )]
    pub workers: usize,
    /// Idle poll interval in milliseconds (upper bound on wake-up latency).
    #[serde(
        deserialize_with = "deserialize_number_from_string",
        default = "default_poll_interval_ms"
    )]
    pub poll_interval_ms: u64,
    /// Seconds an active job may run before it is presumed stranded.
    #[serde(
        deserialize_with = "deserialize_number_from_string",
        default = "default_visibility_timeout_secs"
    )]
    pub visibility_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
        }
    }
}

/// Backup retention tuning.
#[derive(serde::Deserialize, Clone)]
pub struct RetentionConfig {
    /// Days a column backup stays restorable.
    #[serde(
        deserialize_with = "deserialize_number_from_string",
        default = "default_backup_ttl_days"
    )]
    pub backup_ttl_days: i64,
    /// Seconds between sweeps of expired backups.
    #[serde(
        deserialize_with = "deserialize_number_from_string",
        default = "default_sweep_interval_secs"
    )]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            backup_ttl_days: default_backup_ttl_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_visibility_timeout_secs() -> u64 {
    300
}
fn default_backup_ttl_days() -> i64 {
    90
}
fn default_sweep_interval_secs() -> u64 {
    3600
}

impl DatabaseSettings {
    /// Configure the connection options for the SeaORM database
    pub fn get_connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(format!(
            "{}://{}:{}@{}:{}/{}",
            &self.dbms,
            &self.user,
            &self.password.expose_secret(),
            &self.host,
            &self.port,
            &self.database_name
        ))
    }
}

/// Builds config from config files and env variables
pub fn get_configuration() -> Result<Settings, ConfigError> {
    // Set base path
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_dir = std::env::var("STRATA_CONFIG_DIR")
        .unwrap_or_else(|_| "config".to_string());
    let config_dir = base_path.join(config_dir);

    let settings = config::Config::builder()
        // Read app.{yaml|toml|json} file in config directory
        .add_source(config::File::from(config_dir.join("app")).required(true))
        // Add settings from environment variables with prefix STRATA and '__' separator
        // e.g., STRATA_QUEUE__WORKERS=8 would overwrite `Settings.queue.workers`
        .add_source(config::Environment::with_prefix("strata")
            .prefix_separator("_")
            .separator("__")
        )
        .build()?
        // Try to convert config values into Settings type
        .try_deserialize()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_config_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();

        let config_dir = tmp.path();

        fs::write(
            config_dir.join("app.yaml"),
            r#"
application:
  host: 127.0.0.1
  port: 8000

database:
  dbms: "postgres"
  host: "localhost"
  port: 5432
  user: "strata_user"
  password: "strata_password"
  database_name: "strata_db"
"#,
        )
        .unwrap();

        tmp
    }


    #[test]
    fn loads_settings_from_custom_config_dir() {
        // Arrange
        let config_dir = setup_config_dir();

        temp_env::with_var("STRATA_CONFIG_DIR", Some(config_dir.path()), || {
            // Act
            let settings = get_configuration().unwrap();

            // Assert
            assert_eq!(settings.application.port, 8000);
            // Queue and retention sections fall back to defaults when absent.
            assert_eq!(settings.queue.workers, 4);
            assert_eq!(settings.queue.poll_interval_ms, 500);
            assert_eq!(settings.retention.backup_ttl_days, 90);
        });

    }

    #[test]
    fn overwrite_config_setting_with_env_var() {
        // Arrange
        let config_dir = setup_config_dir();

        temp_env::with_vars(
            [
                ("STRATA_CONFIG_DIR", Some(config_dir.path().to_str().unwrap())),
                ("STRATA_QUEUE__WORKERS", Some("8"))
            ],
            || {
                // Act
                let settings = get_configuration().unwrap();

                // Assert
                assert_eq!(settings.queue.workers, 8);
            })
    }
}
