//! Plugin contract.
//!
//! # Architecture
//!
//! A plugin is a trait object bundling up to five hooks. Which hooks it
//! actually implements is declared **once, at registration**, through
//! [`Capabilities`] — the dispatcher checks the declared set instead of
//! probing per message.
//!
//! - `run` — invoked when one of the plugin's command triggers matches.
//! - `always` — the passive hook, invoked for every accepted message
//!   regardless of command routing.
//! - `cron` — invoked by an external scheduler according to the schedule
//!   expression declared in the manifest (the framework owns only this
//!   invocation contract, not the scheduling).
//! - `webhook` — invoked for externally received webhook payloads.
//! - `after_translation` — invoked after a locale bundle was applied so
//!   the plugin can recompute derived state (e.g. generated shortcuts).
//!
//! A plugin's static declaration — name, command descriptors, string
//! table, schedule — lives in its [`PluginManifest`]; registration turns
//! it into live, snapshot-and-swap state owned by the host.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use braid_core::command::{Command, CommandSet};
use braid_core::message::IncomingMessage;

use crate::context::DispatchContext;
use crate::error::PluginResult;
use crate::stores::{ErrorMessages, StringTable};

/// The hook set a plugin declares at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub commands: bool,
    pub always: bool,
    pub cron: bool,
    pub webhook: bool,
    pub after_translation: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        commands: false,
        always: false,
        cron: false,
        webhook: false,
        after_translation: false,
    };

    /// The common case: command handling only.
    pub const COMMANDS: Self = Self {
        commands: true,
        always: false,
        cron: false,
        webhook: false,
        after_translation: false,
    };
}

/// A plugin's static declaration, instantiated into live state by the
/// host at registration.
#[derive(Debug, Clone, Default)]
pub struct PluginManifest {
    pub name: String,
    pub commands: Vec<Command>,
    pub strings: HashMap<String, String>,
    /// Cron expression consumed by the external scheduler.
    pub schedule: Option<String>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    pub fn schedule(mut self, expression: impl Into<String>) -> Self {
        self.schedule = Some(expression.into());
        self
    }
}

/// The handle a hook receives to its own live state plus the shared
/// dispatch context.
///
/// Command and string snapshots are coherent for the lifetime of the
/// handle even while an overlay application is in flight.
#[derive(Clone)]
pub struct PluginCtx {
    pub(crate) name: Arc<str>,
    pub(crate) commands: Arc<CommandSet>,
    pub(crate) strings: Arc<StringTable>,
    pub(crate) shared: Arc<DispatchContext>,
}

impl PluginCtx {
    pub fn plugin_name(&self) -> &str {
        &self.name
    }

    /// Snapshot of this plugin's current command list.
    pub fn commands(&self) -> Arc<Vec<Command>> {
        self.commands.snapshot()
    }

    /// Atomically replaces this plugin's command list.
    ///
    /// Meant for `after_translation` implementations that derive commands
    /// (dynamically generated shortcuts) from translated state.
    pub fn publish_commands(&self, commands: Vec<Command>) {
        self.commands.publish(commands);
    }

    /// Looks up a localized string.
    pub fn string(&self, key: &str) -> Option<String> {
        self.strings.get(key)
    }

    /// The shared per-bot context (identity, prefix, collaborators).
    pub fn context(&self) -> &DispatchContext {
        &self.shared
    }

    /// Snapshot of the shared localized failure strings.
    pub fn errors(&self) -> Arc<ErrorMessages> {
        self.shared.errors.snapshot()
    }
}

impl std::fmt::Debug for PluginCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCtx")
            .field("plugin", &self.name)
            .finish_non_exhaustive()
    }
}

/// The plugin contract. Implement only the hooks your [`Capabilities`]
/// declare; the defaults are no-ops.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Static declaration; read once at registration.
    fn manifest(&self) -> PluginManifest;

    /// Declared hook set; read once at registration.
    fn capabilities(&self) -> Capabilities;

    /// Command handler. `message.extra` carries the extracted input.
    async fn run(&self, ctx: PluginCtx, message: IncomingMessage) -> PluginResult<()> {
        let _ = (ctx, message);
        Ok(())
    }

    /// Passive hook, invoked for every accepted message.
    async fn always(&self, ctx: PluginCtx, message: &IncomingMessage) -> PluginResult<()> {
        let _ = (ctx, message);
        Ok(())
    }

    /// Scheduled hook; the external scheduler decides when.
    async fn cron(&self, ctx: PluginCtx) -> PluginResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Webhook hook for externally received payloads.
    async fn webhook(&self, ctx: PluginCtx, path: &str, payload: &Value) -> PluginResult<()> {
        let _ = (ctx, path, payload);
        Ok(())
    }

    /// Invoked after a locale bundle touched this plugin's state.
    fn after_translation(&self, ctx: PluginCtx) {
        let _ = ctx;
    }
}
