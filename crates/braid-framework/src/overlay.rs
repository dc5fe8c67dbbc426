//! Locale bundles and inheritance-chain resolution.
//!
//! A [`TranslationBundle`] is a per-locale set of overrides: positional
//! command overrides and a string table per plugin, an optional wholesale
//! replacement of the shared error-message table, and an `extends`
//! pointer forming an inheritance chain.
//!
//! [`LocaleCatalog::resolve`] walks the chain from the requested locale to
//! its root, then deep-merges root-first so child values win: map fields
//! merge recursively, scalar fields replace wholesale, and the per-plugin
//! `commands` list merges positionally (index by index, field by field,
//! with `parameters` replacing wholesale).
//!
//! Application of a resolved bundle lives on
//! [`PluginHost::apply_bundle`](crate::host::PluginHost::apply_bundle),
//! which publishes each plugin's merged state in one atomic swap.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use braid_core::command::CommandOverride;

use crate::error::{OverlayError, OverlayResult};
use crate::stores::ErrorMessages;

/// Per-plugin section of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginOverride {
    /// Positional command overrides; index i applies to the plugin's
    /// command at index i.
    #[serde(default)]
    pub commands: Vec<CommandOverride>,
    /// Shallow-merged into the plugin's string table.
    #[serde(default)]
    pub strings: HashMap<String, String>,
}

impl PluginOverride {
    fn merge_from(&mut self, child: &PluginOverride) {
        for (index, over) in child.commands.iter().enumerate() {
            match self.commands.get_mut(index) {
                Some(base) => base.merge_from(over),
                None => self.commands.push(over.clone()),
            }
        }
        self.strings
            .extend(child.strings.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// One locale's overrides, as registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationBundle {
    /// Parent locale this one inherits from.
    #[serde(default)]
    pub extends: Option<String>,
    /// Wholesale replacement of the shared error-message table.
    #[serde(default)]
    pub errors: Option<ErrorMessages>,
    /// Overrides keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, PluginOverride>,
}

/// The fully merged result of walking one inheritance chain.
///
/// Applying the same resolved bundle twice is idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBundle {
    pub locale: String,
    pub errors: Option<ErrorMessages>,
    pub plugins: HashMap<String, PluginOverride>,
}

/// Registry of named locale bundles.
#[derive(Debug, Default)]
pub struct LocaleCatalog {
    bundles: RwLock<HashMap<String, Arc<TranslationBundle>>>,
}

impl LocaleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a locale bundle.
    pub fn insert(&self, locale: impl Into<String>, bundle: TranslationBundle) {
        self.bundles.write().insert(locale.into(), Arc::new(bundle));
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.bundles.read().contains_key(locale)
    }

    /// Resolves a locale's inheritance chain into one merged bundle.
    ///
    /// Cycles and missing parents are reported as configuration errors
    /// rather than being silently tolerated.
    pub fn resolve(&self, locale: &str) -> OverlayResult<ResolvedBundle> {
        let bundles = self.bundles.read();

        // Walk leaf -> root, then merge in reverse so children win.
        let mut chain: Vec<Arc<TranslationBundle>> = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = locale.to_string();
        loop {
            if visited.iter().any(|seen| *seen == current) {
                return Err(OverlayError::ExtendsCycle { locale: current });
            }
            let bundle = bundles.get(&current).ok_or_else(|| {
                if visited.is_empty() {
                    OverlayError::UnknownLocale(current.clone())
                } else {
                    OverlayError::MissingParent {
                        locale: visited.last().cloned().unwrap_or_default(),
                        parent: current.clone(),
                    }
                }
            })?;
            visited.push(current.clone());
            chain.push(Arc::clone(bundle));
            match &bundle.extends {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }

        let mut errors: Option<ErrorMessages> = None;
        let mut plugins: HashMap<String, PluginOverride> = HashMap::new();
        for bundle in chain.iter().rev() {
            if bundle.errors.is_some() {
                errors = bundle.errors.clone();
            }
            for (name, over) in &bundle.plugins {
                plugins.entry(name.clone()).or_default().merge_from(over);
            }
        }

        Ok(ResolvedBundle {
            locale: locale.to_string(),
            errors,
            plugins,
        })
    }
}
