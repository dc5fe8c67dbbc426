//! Error types for the framework layer.

use thiserror::Error;

/// Failure surfaced by a plugin hook.
///
/// These are caught at the dispatcher boundary: logged, mirrored to the
/// operator alert channel, and (for `run` only) answered to the user with
/// the localized generic failure message. They never stop other plugins
/// from handling the same message.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plain failure description.
    #[error("{0}")]
    Message(String),

    /// Any other error a plugin bubbles up.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl PluginError {
    /// Creates a plain-text plugin error.
    pub fn msg(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }
}

/// Result type for plugin hooks.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised while resolving a locale bundle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// The requested locale is not registered in the catalog.
    #[error("unknown locale '{0}'")]
    UnknownLocale(String),

    /// A locale's `extends` pointer names a locale that is not registered.
    #[error("locale '{locale}' extends missing parent '{parent}'")]
    MissingParent { locale: String, parent: String },

    /// The `extends` chain loops back on itself.
    #[error("locale inheritance cycle through '{locale}'")]
    ExtendsCycle { locale: String },
}

/// Result type for overlay resolution.
pub type OverlayResult<T> = Result<T, OverlayError>;
