//! # Braid Framework
//!
//! Plugin system, dispatcher and translation overlay for the Braid bot
//! framework.
//!
//! This layer turns the core engine (`braid-core`) into a running
//! routing fabric:
//!
//! - **Plugin contract**: capability-declared hooks and the per-plugin
//!   context handle ([`plugin`]).
//! - **Dispatch**: one inbound message walked across every plugin with
//!   gating, trigger precedence and per-plugin fault isolation ([`host`]).
//! - **Translation overlay**: locale bundles with inheritance chains,
//!   resolved and applied to live plugin state via snapshot-and-swap
//!   ([`overlay`]).
//! - **Injected collaborators**: permission predicates, tag store,
//!   outbound responder and operator alert sink ([`stores`]).
//! - **Help rendering**: pure command-descriptor introspection ([`help`]).

pub mod context;
pub mod error;
pub mod help;
pub mod host;
pub mod overlay;
pub mod plugin;
pub mod stores;

pub use context::{DispatchContext, DispatchContextBuilder};
pub use error::{OverlayError, OverlayResult, PluginError, PluginResult};
pub use help::describe;
pub use host::{MAX_MESSAGE_AGE, MUTED_TAG, NO_REPLIES_TAG, PluginHost};
pub use overlay::{
    LocaleCatalog, PluginOverride, ResolvedBundle, TranslationBundle,
};
pub use plugin::{Capabilities, Plugin, PluginCtx, PluginManifest};
pub use stores::{
    AlertSink, ErrorMessages, Permissions, Responder, SharedErrorMessages, StringTable, TagStore,
    tag_matches,
};
