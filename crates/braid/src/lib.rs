//! # Braid
//!
//! A multi-platform chat-bot framework: normalized inbound messages are
//! routed to independently developed command plugins through a declarative
//! trigger engine, with a locale overlay that can rewrite a plugin's
//! command vocabulary and strings at runtime without restart.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  bounded   ┌────────────┐     ┌──────────────────────────────┐
//! │ Connectors │──channel──▶│ Dispatcher │────▶│ Plugin "weather" (commands)  │
//! │ (external) │            │ (gating,   │────▶│ Plugin "stats"   (passive)   │
//! └────────────┘            │ triggers)  │────▶│ Plugin ...                   │
//!                           └────────────┘     └──────────────────────────────┘
//!                                 ▲
//!                       LocaleCatalog.resolve → apply_bundle
//! ```
//!
//! - **Connectors** (out of scope here) normalize platform payloads into
//!   `IncomingMessage` and push them into the runtime's sender.
//! - **Dispatcher** walks every plugin per message: staleness/mute/bot
//!   gating, trigger precedence, input extraction, fault isolation.
//! - **Plugins** declare capabilities and command descriptors at
//!   registration; handlers receive their own context with coherent
//!   command/string snapshots.
//! - **Translation overlay** resolves locale inheritance chains and
//!   publishes merged plugin state atomically.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use braid::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BraidRuntime::builder().build()?;
//!     runtime.host().register(WeatherPlugin::default());
//!
//!     // connectors push into runtime.sender()
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub use braid_core as core;
pub use braid_framework as framework;
pub use braid_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use braid::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use braid_runtime::{BraidRuntime, Collaborators, MessageSender};

    // Plugin contract
    pub use braid_framework::plugin::{Capabilities, Plugin, PluginCtx, PluginManifest};
    pub use braid_framework::{PluginError, PluginResult};

    // Dispatch and overlay
    pub use braid_framework::host::PluginHost;
    pub use braid_framework::overlay::{LocaleCatalog, TranslationBundle};

    // Injected collaborator seams
    pub use braid_framework::stores::{
        AlertSink, ErrorMessages, Permissions, Responder, TagStore,
    };

    // Command and message model
    pub use braid_core::command::{Command, CommandOverride, Parameter};
    pub use braid_core::message::{Conversation, IncomingMessage, MessageKind, User};
}
