//! Injected collaborator interfaces and shared string state.
//!
//! The dispatcher never reaches into a global data store. Permission
//! checks, tag lookups, outbound replies and operator alerts all go
//! through the traits below, injected at [`PluginHost`] construction —
//! deterministic unit tests swap in fakes.
//!
//! [`PluginHost`]: crate::host::PluginHost

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PluginResult;

// ============================================================================
// Permission predicates
// ============================================================================

/// Externally supplied boolean permission predicates.
///
/// The framework consumes these; it never implements authentication
/// itself.
#[async_trait]
pub trait Permissions: Send + Sync {
    async fn is_owner(&self, uid: &str) -> bool;
    async fn is_trusted(&self, uid: &str) -> bool;
    async fn is_admin(&self, uid: &str) -> bool;
}

/// Deny-everything default used when no predicate source is injected.
#[derive(Debug, Default)]
pub struct DenyAll;

#[async_trait]
impl Permissions for DenyAll {
    async fn is_owner(&self, _uid: &str) -> bool {
        false
    }

    async fn is_trusted(&self, _uid: &str) -> bool {
        false
    }

    async fn is_admin(&self, _uid: &str) -> bool {
        false
    }
}

// ============================================================================
// Tag store
// ============================================================================

/// Read-through access to the external tag storage.
///
/// `pattern` follows the tag-matching convention: a trailing `?` makes it
/// a prefix match (`lang:?` matches `lang:es`), anything else matches
/// exactly. [`tag_matches`] implements the convention for store authors.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn has_tag(&self, target: &str, pattern: &str) -> bool;
}

/// Checks one stored tag against a lookup pattern.
pub fn tag_matches(tag: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('?') {
        Some(prefix) => tag.starts_with(prefix),
        None => tag == pattern,
    }
}

/// Tag store with no tags at all; the untagged default.
#[derive(Debug, Default)]
pub struct NoTags;

#[async_trait]
impl TagStore for NoTags {
    async fn has_tag(&self, _target: &str, _pattern: &str) -> bool {
        false
    }
}

// ============================================================================
// Outbound seams
// ============================================================================

/// Sends a plain text message back into a conversation.
///
/// Implemented by the platform binding; the dispatcher uses it for the
/// generic failure reply after a handler fault.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send_text(&self, conversation: &str, text: &str) -> PluginResult<()>;
}

/// Mirrors operational failures to the operator alert channel.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, text: &str);
}

/// Default outbound seam that only logs.
#[derive(Debug, Default)]
pub struct LogOnly;

#[async_trait]
impl Responder for LogOnly {
    async fn send_text(&self, conversation: &str, text: &str) -> PluginResult<()> {
        info!(conversation, text, "No responder bound, dropping reply");
        Ok(())
    }
}

#[async_trait]
impl AlertSink for LogOnly {
    async fn alert(&self, text: &str) {
        info!(text, "No alert sink bound, dropping alert");
    }
}

// ============================================================================
// String table
// ============================================================================

/// A plugin's localized string table.
///
/// Snapshot-and-swap like the command registry: readers hold a coherent
/// `Arc` view, the overlay publishes a fully merged replacement map.
#[derive(Debug, Default)]
pub struct StringTable {
    inner: RwLock<Arc<HashMap<String, String>>>,
}

impl StringTable {
    pub fn new(strings: HashMap<String, String>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(strings)),
        }
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        Arc::clone(&self.inner.read())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn publish(&self, strings: HashMap<String, String>) {
        *self.inner.write() = Arc::new(strings);
    }
}

// ============================================================================
// Error message table
// ============================================================================

/// The shared, localized operator/user-facing failure strings.
///
/// Bundles replace this table wholesale, never key-by-key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorMessages {
    /// Reply sent to the user when their command's handler fails.
    pub generic: String,
    /// Upstream API failure.
    pub api: String,
    /// Missing permission.
    pub permission: String,
    /// Service not reachable.
    pub connection: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            generic: "An unexpected error occurred.".into(),
            api: "The service returned an error.".into(),
            permission: "You are not allowed to do that.".into(),
            connection: "The service is not reachable right now.".into(),
        }
    }
}

/// Shared handle to the live [`ErrorMessages`] table.
#[derive(Debug, Clone, Default)]
pub struct SharedErrorMessages {
    inner: Arc<RwLock<Arc<ErrorMessages>>>,
}

impl SharedErrorMessages {
    pub fn new(messages: ErrorMessages) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(messages))),
        }
    }

    pub fn snapshot(&self) -> Arc<ErrorMessages> {
        Arc::clone(&self.inner.read())
    }

    pub fn publish(&self, messages: ErrorMessages) {
        *self.inner.write() = Arc::new(messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_tag_patterns() {
        assert!(tag_matches("muted", "muted"));
        assert!(!tag_matches("muted:spam", "muted"));
        assert!(tag_matches("lang:es", "lang:?"));
        assert!(!tag_matches("language", "lang:?"));
    }

    #[test]
    fn string_table_snapshots_are_stable_across_publish() {
        let table = StringTable::new(HashMap::from([("greeting".into(), "hello".into())]));
        let before = table.snapshot();

        table.publish(HashMap::from([("greeting".into(), "hola".into())]));

        assert_eq!(before.get("greeting").map(String::as_str), Some("hello"));
        assert_eq!(table.get("greeting").as_deref(), Some("hola"));
    }

    #[test]
    fn error_messages_replace_wholesale() {
        let shared = SharedErrorMessages::default();
        shared.publish(ErrorMessages {
            generic: "Algo salió mal.".into(),
            ..ErrorMessages::default()
        });
        assert_eq!(shared.snapshot().generic, "Algo salió mal.");
    }
}
