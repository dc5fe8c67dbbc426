//! Shared dispatch context.
//!
//! One [`DispatchContext`] is built at startup and shared by every
//! dispatch cycle. It carries the bot's identity, the configured prefix,
//! and the injected collaborator interfaces — nothing in it is global
//! state.

use std::sync::Arc;

use braid_core::trigger::TriggerConfig;

use crate::stores::{
    AlertSink, DenyAll, ErrorMessages, LogOnly, NoTags, Permissions, Responder,
    SharedErrorMessages, TagStore,
};

/// Immutable per-bot state plus injected collaborators.
#[derive(Clone)]
pub struct DispatchContext {
    /// The bot's own username, for `@mention` elision.
    pub username: String,
    /// The configured command prefix.
    pub prefix: String,
    /// Conversation id of the operator alert channel, when configured.
    /// Friendly matchers are suppressed there.
    pub alert_conversation: Option<String>,
    pub permissions: Arc<dyn Permissions>,
    pub tags: Arc<dyn TagStore>,
    pub responder: Arc<dyn Responder>,
    pub alerts: Arc<dyn AlertSink>,
    /// Live localized failure strings, wholesale-replaced by bundles.
    pub errors: SharedErrorMessages,
}

impl DispatchContext {
    /// Starts a builder with log-only collaborators and the `/` prefix.
    pub fn builder(username: impl Into<String>) -> DispatchContextBuilder {
        DispatchContextBuilder {
            username: username.into(),
            prefix: braid_core::trigger::DEFAULT_PREFIX.to_string(),
            alert_conversation: None,
            permissions: Arc::new(DenyAll),
            tags: Arc::new(NoTags),
            responder: Arc::new(LogOnly),
            alerts: Arc::new(LogOnly),
            errors: ErrorMessages::default(),
        }
    }

    /// The compiler-facing view of this context.
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig::new(self.prefix.clone(), self.username.clone())
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("username", &self.username)
            .field("prefix", &self.prefix)
            .field("alert_conversation", &self.alert_conversation)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DispatchContext`].
pub struct DispatchContextBuilder {
    username: String,
    prefix: String,
    alert_conversation: Option<String>,
    permissions: Arc<dyn Permissions>,
    tags: Arc<dyn TagStore>,
    responder: Arc<dyn Responder>,
    alerts: Arc<dyn AlertSink>,
    errors: ErrorMessages,
}

impl DispatchContextBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn alert_conversation(mut self, conversation: impl Into<String>) -> Self {
        self.alert_conversation = Some(conversation.into());
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn tags(mut self, tags: Arc<dyn TagStore>) -> Self {
        self.tags = tags;
        self
    }

    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn error_messages(mut self, errors: ErrorMessages) -> Self {
        self.errors = errors;
        self
    }

    pub fn build(self) -> DispatchContext {
        DispatchContext {
            username: self.username,
            prefix: self.prefix,
            alert_conversation: self.alert_conversation,
            permissions: self.permissions,
            tags: self.tags,
            responder: self.responder,
            alerts: self.alerts,
            errors: SharedErrorMessages::new(self.errors),
        }
    }
}
