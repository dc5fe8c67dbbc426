//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BraidConfig {
    /// Bot identity and dispatch settings.
    #[serde(default)]
    pub bot: BotSettings,

    /// Inbound message queue settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot identity and dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// The bot's own username, used for `@mention` elision.
    #[serde(default = "default_username")]
    pub username: String,

    /// User id of the configured owner, when known. Fed to the external
    /// permission predicates; the core only consumes the predicate.
    #[serde(default)]
    pub owner: Option<String>,

    /// Command prefix. Universal commands stay reachable under `/`
    /// regardless of this value.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Locale applied at startup.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Conversation id of the operator alert channel.
    #[serde(default)]
    pub alert_conversation: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            username: default_username(),
            owner: None,
            prefix: default_prefix(),
            locale: default_locale(),
            alert_conversation: None,
        }
    }
}

fn default_username() -> String {
    "bot".to_string()
}

fn default_prefix() -> String {
    braid_core::trigger::DEFAULT_PREFIX.to_string()
}

fn default_locale() -> String {
    "default".to_string()
}

/// Inbound message queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bounded queue capacity. Connectors block (await) when it is full.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
        }
    }
}

fn default_queue_size() -> usize {
    256
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file path; required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `braid_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Include thread ids in log output.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file/line locations in log output.
    #[serde(default)]
    pub file_location: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = BraidConfig::default();
        assert_eq!(config.bot.prefix, "/");
        assert_eq!(config.bot.locale, "default");
        assert_eq!(config.ingest.queue_size, 256);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn parses_from_json_value() {
        let config: BraidConfig = serde_json::from_str(
            r#"{
                "bot": {"username": "braidbot", "prefix": "!", "owner": "42"},
                "logging": {"level": "debug", "format": "pretty"}
            }"#,
        )
        .expect("valid config json");

        assert_eq!(config.bot.username, "braidbot");
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.owner.as_deref(), Some("42"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
