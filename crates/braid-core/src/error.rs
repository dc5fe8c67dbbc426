//! Error types for the core engine.

use thiserror::Error;

/// Errors raised while compiling a command descriptor into matchers.
#[derive(Debug, Clone, Error)]
pub enum TriggerError {
    /// A pattern did not compile as a regular expression.
    ///
    /// Token patterns are built from escaped literals and cannot hit this
    /// in practice; friendly fragments are embedded verbatim and can.
    #[error("pattern '{pattern}' does not compile: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for trigger compilation.
pub type TriggerResult<T> = Result<T, TriggerError>;
