//! Configuration module for the Braid runtime.
//!
//! Provides layered, figment-based configuration loading and validation
//! for the bot identity, ingest queue and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, BraidConfig, IngestConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
};
pub use validation::validate_config;
