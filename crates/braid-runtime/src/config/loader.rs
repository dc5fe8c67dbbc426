//! Configuration loader using figment.
//!
//! Supports layered configuration from multiple sources, later sources
//! overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`braid.{profile}.toml`)
//! 3. Main config file (`braid.toml`)
//! 4. Environment variables (`BRAID_*`, `__` as nesting separator)
//! 5. Programmatic overrides
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files (`braid.toml`)
//! - `yaml-config`: enables YAML configuration files (`braid.yaml`)
//!
//! Both can be enabled simultaneously; both formats are then searched.
//!
//! # Example
//!
//! ```rust,ignore
//! use braid_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/braid.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::BraidConfig;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "BRAID_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Creates a profile from `BRAID_PROFILE` or defaults to Development.
    pub fn from_env() -> Self {
        std::env::var("BRAID_PROFILE")
            .map(|p| match p.to_lowercase().as_str() {
                "production" | "prod" => Self::Production,
                "development" | "dev" => Self::Development,
                other => Self::Custom(other.to_string()),
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(mut self) -> Self {
        if let Ok(dir) = std::env::current_dir() {
            self.search_paths.push(dir);
        }
        self
    }

    /// Adds the user config directory (`~/.config/braid`) to the search
    /// paths.
    pub fn with_user_dir(mut self) -> Self {
        if let Some(dir) = dirs::config_dir() {
            self.search_paths.push(dir.join("braid"));
        }
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        let name = profile.into();
        self.profile = match name.to_lowercase().as_str() {
            "production" | "prod" => Profile::Production,
            "development" | "dev" => Profile::Development,
            _ => Profile::Custom(name),
        };
        self
    }

    /// Sets a specific configuration file to load (overrides search).
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BraidConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<BraidConfig> {
        let mut figment = Figment::from(Serialized::defaults(BraidConfig::default()));

        if let Some(file) = &self.config_file {
            if !file.exists() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
            figment = self.merge_file(figment, file);
        } else {
            for dir in &self.search_paths {
                for candidate in self.candidates(dir) {
                    if candidate.exists() {
                        debug!(file = %candidate.display(), "Loading configuration file");
                        figment = self.merge_file(figment, &candidate);
                    }
                }
            }
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        // Programmatic overrides win over everything else.
        figment = figment.merge(self.figment);

        Ok(figment.extract()?)
    }

    /// Candidate file names, profile-specific first so the main file wins.
    fn candidates(&self, dir: &Path) -> Vec<PathBuf> {
        let mut names: Vec<String> = Vec::new();
        #[cfg(feature = "toml-config")]
        {
            names.push(format!("braid.{}.toml", self.profile));
            names.push("braid.toml".to_string());
        }
        #[cfg(feature = "yaml-config")]
        {
            names.push(format!("braid.{}.yaml", self.profile));
            names.push("braid.yaml".to_string());
        }
        names.into_iter().map(|name| dir.join(name)).collect()
    }

    fn merge_file(&self, figment: Figment, path: &Path) -> Figment {
        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "toml-config")]
            Some("toml") => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            _ => figment,
        }
    }
}

/// Loads configuration from default locations.
pub fn load_config() -> ConfigResult<BraidConfig> {
    ConfigLoader::new().with_current_dir().with_user_dir().load()
}

/// Loads configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BraidConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = ConfigLoader::new().without_env().load().expect("defaults");
        assert_eq!(config.bot.prefix, "/");
        assert_eq!(config.ingest.queue_size, 256);
    }

    #[test]
    fn programmatic_merge_overrides_defaults() {
        let mut overrides = BraidConfig::default();
        overrides.bot.prefix = "!".to_string();

        let config = ConfigLoader::new()
            .without_env()
            .merge(overrides)
            .load()
            .expect("loads");
        assert_eq!(config.bot.prefix, "!");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/braid.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
