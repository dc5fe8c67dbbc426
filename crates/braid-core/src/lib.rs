//! # Braid Core
//!
//! The message and trigger engine of the Braid bot framework.
//!
//! This crate holds the pieces every other layer builds on:
//!
//! - **Message model**: the normalized [`IncomingMessage`] shape platform
//!   connectors produce, with the mutable extra bag that carries extracted
//!   command input ([`message`]).
//! - **Command descriptors**: declarative [`Command`] definitions, their
//!   bundle-override mirror, and the snapshot-and-swap [`CommandSet`]
//!   registry ([`command`]).
//! - **Trigger compilation**: turning one descriptor plus runtime
//!   prefix/identity state into an ordered, cached set of matchers with
//!   the anchoring rules ([`trigger`]).
//! - **Input extraction**: slicing trailing free-text arguments out of a
//!   matched message ([`input`]).
//!
//! Dispatch, plugins and the translation overlay live in
//! `braid-framework`; orchestration, config and logging in
//! `braid-runtime`.

pub mod command;
pub mod error;
pub mod input;
pub mod message;
pub mod trigger;

pub use command::{Command, CommandOverride, CommandSet, Parameter};
pub use error::{TriggerError, TriggerResult};
pub use input::extract;
pub use message::{Conversation, IncomingMessage, MessageExtra, MessageKind, User};
pub use trigger::{
    DEFAULT_PREFIX, MatchScope, TriggerCache, TriggerConfig, TriggerHit, TriggerKind, TriggerSet,
    UNIVERSAL_COMMANDS,
};
