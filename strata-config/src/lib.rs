//! # Strata Config
//!
//! `strata-config` provides configuration schema parsing and runtime configuration
//! management for the Strata field migration system. Supports YAML, TOML, and JSON
//! configuration files layered with `STRATA_`-prefixed environment variables.

#![warn(missing_docs)]

pub mod error;
pub mod settings_parser;

pub use error::ConfigError;
pub use settings_parser::{Settings, get_configuration};
