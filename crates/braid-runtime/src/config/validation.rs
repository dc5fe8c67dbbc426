//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BraidConfig, LogFormat, LogOutput};

/// Validates the entire configuration.
pub fn validate_config(config: &BraidConfig) -> ConfigResult<()> {
    if config.bot.username.is_empty() {
        return Err(ConfigError::missing_field("bot.username"));
    }

    if config.bot.prefix.is_empty() {
        return Err(ConfigError::validation("Command prefix must not be empty"));
    }

    if config.bot.locale.is_empty() {
        return Err(ConfigError::missing_field("bot.locale"));
    }

    if config.ingest.queue_size == 0 {
        return Err(ConfigError::validation(
            "Ingest queue size must be greater than 0",
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if config.logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the 'json-log' feature",
        ));
    }

    Ok(())
}
