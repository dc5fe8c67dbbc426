//! Trigger compilation and matching.
//!
//! A [`Command`] descriptor compiles into a [`TriggerSet`]: up to five
//! matchers in fixed precedence order, each case-insensitive and
//! multi-line. The dispatcher tries them in that order and stops at the
//! first hit.
//!
//! # Design
//!
//! Patterns are assembled from a small typed AST ([`Part`]) and rendered
//! into `regex::Regex` values once per `(command, prefix, keep-default)`
//! combination — there is no string concatenation at match time. What
//! *does* depend on the individual message (self-mention elision, the
//! exact-vs-spaced anchoring choice, the universal-command literal form)
//! is resolved inside [`TriggerSet::first_match`] by selecting among the
//! precompiled alternatives.
//!
//! Compiled sets are memoized in a [`TriggerCache`] keyed by the command
//! registry's publish revision, so an overlay application invalidates
//! exactly the sets it replaced.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::command::Command;
use crate::error::{TriggerError, TriggerResult};

/// The literal prefix `keep_default` commands stay reachable under.
pub const DEFAULT_PREFIX: &str = "/";

/// Commands that must stay reachable regardless of the configured prefix.
pub const UNIVERSAL_COMMANDS: &[&str] = &["/start", "/help", "/config"];

/// Runtime state the compiler folds into every pattern.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// The configured command prefix, e.g. `/` or `!`.
    pub prefix: String,
    /// The bot's own username, for `@mention` elision.
    pub bot_username: String,
}

impl TriggerConfig {
    pub fn new(prefix: impl Into<String>, bot_username: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            bot_username: bot_username.into(),
        }
    }
}

/// Which matcher variant produced a hit. Order of declaration is the
/// precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Canonical,
    CanonicalKeepDefault,
    Friendly,
    Shortcut,
    ShortcutKeepDefault,
}

/// Per-message inputs gating the friendly matcher.
///
/// Friendly patterns are conversational and are suppressed in the
/// operator alert channel and wherever a `noreplies` tag applies.
#[derive(Debug, Clone, Copy)]
pub struct MatchScope {
    pub allow_friendly: bool,
}

impl MatchScope {
    pub const ALL: Self = Self {
        allow_friendly: true,
    };
}

/// A successful trigger match.
///
/// `compared` is the text the matcher actually ran against (the raw
/// content minus any elided self-mention); `end` is the byte offset just
/// past the matched trigger token within it. Input extraction slices from
/// there.
#[derive(Debug, Clone)]
pub struct TriggerHit {
    pub kind: TriggerKind,
    pub compared: String,
    pub end: usize,
}

// ============================================================================
// Pattern AST
// ============================================================================

/// One element of a trigger pattern.
#[derive(Debug, Clone)]
enum Part {
    /// `^` — with the multi-line flag this also matches at line starts,
    /// which is intended.
    StartAnchor,
    /// Escaped literal text.
    Literal(String),
    /// A friendly fragment, embedded verbatim.
    Fragment(String),
    /// Exactly one space separating the token from trailing arguments.
    ArgBoundary,
    /// `$`.
    EndAnchor,
}

/// Renders parts into a pattern string.
///
/// When an [`Part::ArgBoundary`] is present the token portion is wrapped
/// in a capture group so the match span can end at the token rather than
/// the separating space.
fn render(parts: &[Part]) -> String {
    let grouped = parts.iter().any(|p| matches!(p, Part::ArgBoundary));
    let mut pattern = String::new();
    for part in parts {
        match part {
            Part::StartAnchor => {
                pattern.push('^');
                if grouped {
                    pattern.push('(');
                }
            }
            Part::Literal(text) => pattern.push_str(&regex::escape(text)),
            Part::Fragment(fragment) => pattern.push_str(fragment),
            Part::ArgBoundary => pattern.push_str(") "),
            Part::EndAnchor => pattern.push('$'),
        }
    }
    pattern
}

fn compile(parts: &[Part]) -> TriggerResult<Regex> {
    let pattern = render(parts);
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|source| TriggerError::BadPattern { pattern, source })
}

// ============================================================================
// Compiled matchers
// ============================================================================

/// The two anchoring alternatives of one token form.
///
/// `exact` requires end-of-input right after the token; `spaced` (built
/// only when the command declares parameters) requires exactly one
/// trailing space so a prefix of a longer word cannot falsely match.
#[derive(Debug)]
struct AnchoredPair {
    exact: Regex,
    spaced: Option<Regex>,
}

impl AnchoredPair {
    fn build(leading: &str, body: &str, with_args: bool) -> TriggerResult<Self> {
        let token = |tail: Part| {
            vec![
                Part::StartAnchor,
                Part::Literal(leading.to_string()),
                Part::Literal(body.to_string()),
                tail,
            ]
        };
        let exact = compile(&token(Part::EndAnchor))?;
        let spaced = if with_args {
            Some(compile(&token(Part::ArgBoundary))?)
        } else {
            None
        };
        Ok(Self { exact, spaced })
    }

    /// Matches `compared`, returning the byte offset just past the token.
    fn find_end(&self, compared: &str, spaced: bool) -> Option<usize> {
        if spaced {
            let caps = self.spaced.as_ref()?.captures(compared)?;
            Some(caps.get(1)?.end())
        } else {
            Some(self.exact.find(compared)?.end())
        }
    }
}

/// A compiled canonical or shortcut form.
#[derive(Debug)]
struct TokenTrigger {
    pair: AnchoredPair,
    /// For universal commands: the `^` + literal-token form that ignores
    /// the configured prefix, plus the lowercased token for the raw-text
    /// containment check that selects it.
    literal: Option<(String, AnchoredPair)>,
}

impl TokenTrigger {
    fn build(token: &str, leading: &str, with_args: bool) -> TriggerResult<Self> {
        let body = token.strip_prefix('/').unwrap_or(token);
        let pair = AnchoredPair::build(leading, body, with_args)?;
        let literal = if is_universal(token) {
            let pair = AnchoredPair::build("", token, with_args)?;
            Some((token.to_lowercase(), pair))
        } else {
            None
        };
        Ok(Self { pair, literal })
    }

    fn matches(&self, raw: &str, bot_username: &str, has_params: bool) -> Option<(String, usize)> {
        let compared = elide_trailing_mention(raw, bot_username);
        let pair = match &self.literal {
            Some((token, literal)) if raw.to_lowercase().contains(token) => literal,
            _ => &self.pair,
        };
        let spaced = has_params && compared.contains(char::is_whitespace);
        let end = pair.find_end(&compared, spaced)?;
        Some((compared.into_owned(), end))
    }
}

#[derive(Debug)]
enum Matcher {
    Token(TokenTrigger),
    Friendly(Regex),
}

fn is_universal(token: &str) -> bool {
    UNIVERSAL_COMMANDS
        .iter()
        .any(|universal| universal.eq_ignore_ascii_case(token))
}

// ============================================================================
// Mention elision
// ============================================================================

/// Strips a trailing `@<bot_username>` when nothing follows it.
fn elide_trailing_mention<'a>(raw: &'a str, bot_username: &str) -> std::borrow::Cow<'a, str> {
    if bot_username.is_empty() {
        return raw.into();
    }
    let mention_len = bot_username.len() + 1;
    if raw.len() >= mention_len && raw.is_char_boundary(raw.len() - mention_len) {
        let (head, tail) = raw.split_at(raw.len() - mention_len);
        if let Some(name) = tail.strip_prefix('@')
            && name.eq_ignore_ascii_case(bot_username)
        {
            return head.into();
        }
    }
    raw.into()
}

/// Strips the first `@<bot_username>` that is followed by whitespace.
fn elide_inline_mention<'a>(raw: &'a str, bot_username: &str) -> std::borrow::Cow<'a, str> {
    if bot_username.is_empty() {
        return raw.into();
    }
    let mention_len = bot_username.len() + 1;
    let mut start = 0;
    while start + mention_len <= raw.len() {
        if !raw.is_char_boundary(start) || !raw.is_char_boundary(start + mention_len) {
            start += 1;
            continue;
        }
        let end = start + mention_len;
        let is_mention = raw[start..end]
            .strip_prefix('@')
            .is_some_and(|name| name.eq_ignore_ascii_case(bot_username));
        if is_mention && raw[end..].chars().next().is_some_and(char::is_whitespace) {
            let mut out = String::with_capacity(raw.len() - mention_len);
            out.push_str(&raw[..start]);
            out.push_str(&raw[end..]);
            return out.into();
        }
        start += 1;
    }
    raw.into()
}

// ============================================================================
// TriggerSet
// ============================================================================

/// The ordered matchers of one command.
#[derive(Debug)]
pub struct TriggerSet {
    variants: Vec<(TriggerKind, Matcher)>,
    has_params: bool,
}

impl TriggerSet {
    /// Compiles a command under the given prefix/identity state.
    ///
    /// A friendly fragment that fails to compile is logged and skipped;
    /// the remaining variants still match.
    pub fn compile(command: &Command, config: &TriggerConfig) -> TriggerResult<Self> {
        let has_params = command.has_parameters();
        let mut variants = Vec::with_capacity(5);

        let token = TokenTrigger::build(&command.command, &config.prefix, has_params)?;
        variants.push((TriggerKind::Canonical, Matcher::Token(token)));

        if command.keep_default {
            let token = TokenTrigger::build(&command.command, DEFAULT_PREFIX, has_params)?;
            variants.push((TriggerKind::CanonicalKeepDefault, Matcher::Token(token)));
        }

        if let Some(fragment) = &command.friendly {
            match compile(&[Part::Fragment(fragment.clone())]) {
                Ok(regex) => variants.push((TriggerKind::Friendly, Matcher::Friendly(regex))),
                Err(error) => warn!(
                    command = %command.command,
                    %error,
                    "Friendly pattern does not compile, variant skipped"
                ),
            }
        }

        if let Some(shortcut) = &command.shortcut {
            let token = TokenTrigger::build(shortcut, &config.prefix, has_params)?;
            variants.push((TriggerKind::Shortcut, Matcher::Token(token)));

            if command.keep_default {
                let token = TokenTrigger::build(shortcut, DEFAULT_PREFIX, has_params)?;
                variants.push((TriggerKind::ShortcutKeepDefault, Matcher::Token(token)));
            }
        }

        Ok(Self {
            variants,
            has_params,
        })
    }

    /// Tries the matchers in precedence order and returns the first hit.
    pub fn first_match(
        &self,
        raw: &str,
        config: &TriggerConfig,
        scope: MatchScope,
    ) -> Option<TriggerHit> {
        for (kind, matcher) in &self.variants {
            let hit = match matcher {
                Matcher::Token(token) => token
                    .matches(raw, &config.bot_username, self.has_params)
                    .map(|(compared, end)| TriggerHit {
                        kind: *kind,
                        compared,
                        end,
                    }),
                Matcher::Friendly(regex) => {
                    if !scope.allow_friendly {
                        continue;
                    }
                    let compared = elide_inline_mention(raw, &config.bot_username);
                    regex.find(&compared).map(|found| TriggerHit {
                        kind: *kind,
                        end: found.end(),
                        compared: compared.clone().into_owned(),
                    })
                }
            };
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    /// Number of compiled variants (for introspection and tests).
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}

// ============================================================================
// TriggerCache
// ============================================================================

/// Memoizes compiled [`TriggerSet`]s per command index.
///
/// Entries are keyed by the owning registry's publish revision; a lookup
/// under a newer revision drops the previous generation wholesale. A
/// prefix change requires an explicit [`invalidate`](Self::invalidate).
#[derive(Debug, Default)]
pub struct TriggerCache {
    inner: RwLock<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    revision: u64,
    sets: HashMap<usize, Arc<TriggerSet>>,
}

impl TriggerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached set for `(revision, index)`, compiling on miss.
    ///
    /// Compilation failures are logged and yield `None`; the command is
    /// skipped for this message and retried on the next lookup.
    pub fn get_or_compile(
        &self,
        revision: u64,
        index: usize,
        build: impl FnOnce() -> TriggerResult<TriggerSet>,
    ) -> Option<Arc<TriggerSet>> {
        {
            let inner = self.inner.read();
            if inner.revision == revision
                && let Some(set) = inner.sets.get(&index)
            {
                return Some(Arc::clone(set));
            }
        }

        let set = match build() {
            Ok(set) => Arc::new(set),
            Err(error) => {
                warn!(index, %error, "Trigger compilation failed, command skipped");
                return None;
            }
        };

        let mut inner = self.inner.write();
        if inner.revision != revision {
            inner.revision = revision;
            inner.sets.clear();
        }
        inner.sets.insert(index, Arc::clone(&set));
        Some(set)
    }

    /// Drops every cached set, regardless of revision.
    pub fn invalidate(&self) {
        let mut inner = self.inner.write();
        inner.sets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Parameter;

    fn config() -> TriggerConfig {
        TriggerConfig::new("/", "testbot")
    }

    fn hit(set: &TriggerSet, text: &str) -> Option<TriggerHit> {
        set.first_match(text, &config(), MatchScope::ALL)
    }

    #[test]
    fn parameterless_command_matches_exactly() {
        let command = Command::new("/ping");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        assert!(hit(&set, "/ping").is_some());
        assert!(hit(&set, "/ping x").is_none());
        assert!(hit(&set, "/pingx").is_none());
    }

    #[test]
    fn parameters_allow_bare_and_spaced_forms() {
        let command = Command::new("/weather").parameter(Parameter::optional("place"));
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        let bare = hit(&set, "/weather").expect("bare form");
        assert_eq!(bare.end, "/weather".len());

        let spaced = hit(&set, "/weather Madrid").expect("spaced form");
        assert_eq!(&spaced.compared[spaced.end..], " Madrid");

        // A prefix of a longer word must not match.
        assert!(hit(&set, "/weatherman Madrid").is_none());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let command = Command::new("/ping");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        assert!(hit(&set, "/PING").is_some());
    }

    #[test]
    fn custom_prefix_replaces_leading_slash() {
        let cfg = TriggerConfig::new("!", "testbot");
        let command = Command::new("/ping");
        let set = TriggerSet::compile(&command, &cfg).expect("compiles");

        assert!(set.first_match("!ping", &cfg, MatchScope::ALL).is_some());
        assert!(set.first_match("/ping", &cfg, MatchScope::ALL).is_none());
    }

    #[test]
    fn keep_default_adds_second_canonical_matcher() {
        let cfg = TriggerConfig::new("!", "testbot");
        let command = Command::new("/ping").keep_default();
        let set = TriggerSet::compile(&command, &cfg).expect("compiles");

        let via_custom = set.first_match("!ping", &cfg, MatchScope::ALL).expect("custom prefix");
        assert_eq!(via_custom.kind, TriggerKind::Canonical);

        let via_default = set.first_match("/ping", &cfg, MatchScope::ALL).expect("default prefix");
        assert_eq!(via_default.kind, TriggerKind::CanonicalKeepDefault);
    }

    #[test]
    fn universal_commands_ignore_configured_prefix() {
        let cfg = TriggerConfig::new("!", "testbot");
        let command = Command::new("/help");
        let set = TriggerSet::compile(&command, &cfg).expect("compiles");

        assert!(set.first_match("/help", &cfg, MatchScope::ALL).is_some());
        assert!(set.first_match("!help", &cfg, MatchScope::ALL).is_some());
    }

    #[test]
    fn trailing_self_mention_is_elided_for_tokens() {
        let command = Command::new("/ping");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        let found = hit(&set, "/ping@testbot").expect("mention elided");
        assert_eq!(found.compared, "/ping");

        // With arguments following, the canonical form does not elide.
        let with_params = Command::new("/echo").parameter(Parameter::required("text"));
        let set = TriggerSet::compile(&with_params, &config()).expect("compiles");
        assert!(hit(&set, "/echo@testbot hi").is_none());
    }

    #[test]
    fn friendly_pattern_is_unanchored_and_gated() {
        let command = Command::new("/weather")
            .parameter(Parameter::optional("place"))
            .friendly("what(?:'s| is) the weather");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        let found = hit(&set, "hey, what is the weather in Madrid").expect("friendly hit");
        assert_eq!(found.kind, TriggerKind::Friendly);
        assert_eq!(&found.compared[found.end..], " in Madrid");

        let muted = set.first_match(
            "what is the weather",
            &config(),
            MatchScope {
                allow_friendly: false,
            },
        );
        assert!(muted.is_none());
    }

    #[test]
    fn friendly_elides_inline_mention_followed_by_whitespace() {
        let command = Command::new("/weather").friendly("weather");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        let found = hit(&set, "@testbot weather please").expect("mention elided inline");
        assert_eq!(found.compared, " weather please");
    }

    #[test]
    fn shortcut_ranks_below_friendly() {
        let command = Command::new("/weather")
            .friendly("w")
            .shortcut("/w");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        // "/w" contains the friendly fragment "w", so friendly wins.
        let found = hit(&set, "/w").expect("hit");
        assert_eq!(found.kind, TriggerKind::Friendly);

        let gated = set.first_match(
            "/w",
            &config(),
            MatchScope {
                allow_friendly: false,
            },
        );
        assert_eq!(gated.expect("shortcut hit").kind, TriggerKind::Shortcut);
    }

    #[test]
    fn bad_friendly_fragment_is_skipped_not_fatal() {
        let command = Command::new("/oops").friendly("(unclosed");
        let set = TriggerSet::compile(&command, &config()).expect("compiles");

        assert_eq!(set.variant_count(), 1);
        assert!(hit(&set, "/oops").is_some());
    }

    #[test]
    fn cache_drops_stale_revision() {
        let cache = TriggerCache::new();
        let command = Command::new("/ping");

        let first = cache
            .get_or_compile(0, 0, || TriggerSet::compile(&command, &config()))
            .expect("compiled");
        let again = cache
            .get_or_compile(0, 0, || panic!("must reuse cached set"))
            .expect("cached");
        assert!(Arc::ptr_eq(&first, &again));

        let rebuilt = cache
            .get_or_compile(1, 0, || TriggerSet::compile(&command, &config()))
            .expect("recompiled");
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }
}
