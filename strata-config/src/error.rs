//! Defines the error types specific to the `strata-config` crate.

use thiserror::Error;

/// Represents errors that occur during configuration parsing, loading, and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error originating from the `config` crate when building configuration.
    #[error("Configuration build failed: {0}")]
    ConfigBuildError(#[from] config::ConfigError),

    /// Error due to validation failures of configuration entities.
    #[error("Validation failed: {0}")]
    ValidationErrors(#[from] validator::ValidationErrors),
}
