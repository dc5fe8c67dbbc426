//! Command descriptors and per-plugin registries.
//!
//! A [`Command`] is a declarative description of one trigger vocabulary
//! entry: the canonical slash token, an optional natural-language
//! `friendly` pattern, an optional `shortcut`, and the ordered parameter
//! list that drives trigger anchoring. Plugins declare commands in their
//! manifest; the translation overlay may rewrite any field at runtime.
//!
//! # Snapshot-and-swap
//!
//! [`CommandSet`] is the live registry. Readers take an `Arc` snapshot and
//! keep a coherent view for the whole dispatch even while an overlay is
//! being applied; writers build the fully merged replacement list off to
//! the side and publish it in one swap. Each publish bumps a revision
//! counter that downstream trigger caches key on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One declared argument of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// Declarative descriptor of one command.
///
/// `parameters` is either `None` (the command accepts no arguments and its
/// canonical trigger only matches exactly) or a non-empty ordered list;
/// deserialized empty lists are normalized to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Canonical trigger token, e.g. `/weather`.
    pub command: String,
    /// Free-form regex fragment matched without injected anchors.
    #[serde(default)]
    pub friendly: Option<String>,
    /// Alternate short token, e.g. `/w`.
    #[serde(default)]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default)]
    pub description: String,
    /// Hidden from listings aimed at regular users.
    #[serde(default)]
    pub hidden: bool,
    /// Excluded from generated help text.
    #[serde(default)]
    pub skip_help: bool,
    /// Also reachable via the literal default prefix when the configured
    /// prefix differs.
    #[serde(default)]
    pub keep_default: bool,
}

impl Command {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            friendly: None,
            shortcut: None,
            parameters: None,
            description: String::new(),
            hidden: false,
            skip_help: false,
            keep_default: false,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn friendly(mut self, pattern: impl Into<String>) -> Self {
        self.friendly = Some(pattern.into());
        self
    }

    pub fn shortcut(mut self, token: impl Into<String>) -> Self {
        self.shortcut = Some(token.into());
        self
    }

    /// Appends one parameter, turning a `None` list into a singleton.
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.get_or_insert_with(Vec::new).push(parameter);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn skip_help(mut self) -> Self {
        self.skip_help = true;
        self
    }

    pub fn keep_default(mut self) -> Self {
        self.keep_default = true;
        self
    }

    /// Restores the `parameters`-is-`None`-or-non-empty invariant after
    /// deserialization or an overlay merge.
    pub fn normalize(&mut self) {
        if self.parameters.as_ref().is_some_and(Vec::is_empty) {
            self.parameters = None;
        }
    }

    pub fn has_parameters(&self) -> bool {
        self.parameters.as_ref().is_some_and(|p| !p.is_empty())
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Partial-field mirror of [`Command`], the unit of a locale bundle's
/// command list.
///
/// Only fields actually present apply to the target command; `parameters`,
/// when present, replaces the target list wholesale instead of merging
/// element-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOverride {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub friendly: Option<String>,
    #[serde(default)]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub skip_help: Option<bool>,
    #[serde(default)]
    pub keep_default: Option<bool>,
}

impl CommandOverride {
    /// Merges the fields present in this override into `target`.
    pub fn apply_to(&self, target: &mut Command) {
        if let Some(command) = &self.command {
            target.command = command.clone();
        }
        if let Some(friendly) = &self.friendly {
            target.friendly = Some(friendly.clone());
        }
        if let Some(shortcut) = &self.shortcut {
            target.shortcut = Some(shortcut.clone());
        }
        if let Some(parameters) = &self.parameters {
            target.parameters = Some(parameters.clone());
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(hidden) = self.hidden {
            target.hidden = hidden;
        }
        if let Some(skip_help) = self.skip_help {
            target.skip_help = skip_help;
        }
        if let Some(keep_default) = self.keep_default {
            target.keep_default = keep_default;
        }
        target.normalize();
    }

    /// Folds a child override over this one; fields set in `child` win.
    ///
    /// Used when resolving a locale inheritance chain root-first.
    pub fn merge_from(&mut self, child: &CommandOverride) {
        macro_rules! take {
            ($field:ident) => {
                if child.$field.is_some() {
                    self.$field = child.$field.clone();
                }
            };
        }
        take!(command);
        take!(friendly);
        take!(shortcut);
        take!(parameters);
        take!(description);
        take!(hidden);
        take!(skip_help);
        take!(keep_default);
    }

    /// Materializes a fresh [`Command`] slot from this override alone.
    ///
    /// Missing fields fall back to defaults, including an empty canonical
    /// token when the override carries none.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(self.command.clone().unwrap_or_default());
        self.apply_to(&mut command);
        command
    }
}

// ============================================================================
// CommandSet
// ============================================================================

/// The live, per-plugin command registry.
///
/// Order is registration order and significant: within a plugin the first
/// matching command wins. Mutation is publish-only; see the module docs.
#[derive(Debug)]
pub struct CommandSet {
    commands: RwLock<Arc<Vec<Command>>>,
    revision: AtomicU64,
}

impl CommandSet {
    pub fn new(mut commands: Vec<Command>) -> Self {
        for command in &mut commands {
            command.normalize();
        }
        Self {
            commands: RwLock::new(Arc::new(commands)),
            revision: AtomicU64::new(0),
        }
    }

    /// Returns a coherent snapshot of the current list.
    pub fn snapshot(&self) -> Arc<Vec<Command>> {
        Arc::clone(&self.commands.read())
    }

    /// Atomically replaces the list and bumps the revision.
    pub fn publish(&self, mut commands: Vec<Command>) {
        for command in &mut commands {
            command.normalize();
        }
        let next = Arc::new(commands);
        *self.commands.write() = next;
        self.revision.fetch_add(1, Ordering::Release);
    }

    /// Monotonic counter identifying the published generation.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
