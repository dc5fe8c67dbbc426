//! Braid Runtime - Orchestration layer for the Braid bot framework.
//!
//! This crate provides:
//! - Runtime orchestration (`BraidRuntime`): plugin host ownership,
//!   locale application, lifecycle and shutdown signals
//! - Bounded inbound message wiring (`ingest`)
//! - Layered configuration loading (`config`, figment-based)
//! - Logging configuration (`logging`, tracing-based)
//!
//! # Feature Flags
//!
//! - `toml-config`: TOML configuration files (`braid.toml`)
//! - `yaml-config`: YAML configuration files (`braid.yaml`)
//! - `json-log`: JSON log output format
//!
//! ```ignore
//! use braid_runtime::BraidRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BraidRuntime::builder().build()?;
//!     runtime.host().register(MyPlugin::default());
//!     runtime.register_locale("es", my_spanish_bundle());
//!
//!     // Platform connectors push into runtime.sender()
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{BraidConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use ingest::MessageSender;
pub use logging::LoggingBuilder;
pub use runtime::{BraidRuntime, Collaborators, RuntimeBuilder};

// Re-export tracing for use by plugin crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros alongside the runtime types.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
