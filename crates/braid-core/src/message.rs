//! Normalized message model.
//!
//! Platform connectors (out of scope for this crate) convert their native
//! payloads into [`IncomingMessage`] before handing them to the dispatcher.
//! Everything downstream — trigger matching, input extraction, plugin
//! handlers — works against this one shape regardless of the backing chat
//! protocol.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ============================================================================
// Message Kind
// ============================================================================

/// The content type tag of an inbound message.
///
/// Only [`Text`](MessageKind::Text) messages participate in command
/// matching; the others are still delivered to passive hooks.
/// [`InlineQuery`](MessageKind::InlineQuery) is exempt from the dispatcher's
/// staleness gate because inline queries are answered on demand, not
/// replayed from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
    Audio,
    Document,
    Sticker,
    Video,
    Voice,
    Location,
    InlineQuery,
    Unsupported,
}

// ============================================================================
// Participants
// ============================================================================

/// A user account as seen by the platform connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform-scoped user id.
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Set by the connector when the sender is a bot account.
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    pub fn new(id: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: None,
            username: None,
            is_bot: false,
        }
    }
}

/// The conversation (private chat, group, channel) a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Platform-scoped conversation id.
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }
}

// ============================================================================
// Extra bag
// ============================================================================

/// Mutable per-message scratch space.
///
/// `input` / `input_reply` are populated by the input extractor after a
/// trigger match; the open `fields` map is free for plugins to stash
/// private data during a dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageExtra {
    /// Trailing free-text after the matched trigger, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Like `input`, but with the replied-to message's text appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_reply: Option<String>,
    /// Plugin-private fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// IncomingMessage
// ============================================================================

/// One normalized inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Platform-scoped message id.
    pub id: String,
    pub conversation: Conversation,
    pub sender: User,
    /// Textual content; `None` for non-text payloads.
    pub content: Option<String>,
    pub kind: MessageKind,
    /// The message this one replies to, when the platform links it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Box<IncomingMessage>>,
    /// Arrival timestamp, used by the staleness gate.
    pub date: SystemTime,
    #[serde(default)]
    pub extra: MessageExtra,
}

impl IncomingMessage {
    /// Creates a text message arriving now, with an empty extra bag.
    pub fn text(
        id: impl Into<String>,
        conversation: Conversation,
        sender: User,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation,
            sender,
            content: Some(content.into()),
            kind: MessageKind::Text,
            reply: None,
            date: SystemTime::now(),
            extra: MessageExtra::default(),
        }
    }

    /// Returns the trailing argument text captured at match time.
    ///
    /// With `ignore_reply` the reply-aware variant is skipped and only the
    /// text typed in this message is returned.
    pub fn input(&self, ignore_reply: bool) -> Option<&str> {
        if ignore_reply {
            self.extra.input.as_deref()
        } else {
            self.extra.input_reply.as_deref()
        }
    }

    /// `true` when the message carries non-empty textual content.
    pub fn has_text(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}
