//! Plugin registration, message dispatch and bundle application.
//!
//! [`PluginHost`] is the central owner of all registered plugins. It:
//!
//! - Instantiates each plugin's manifest into live snapshot-and-swap
//!   state (command registry, string table) at registration, reading the
//!   declared [`Capabilities`] exactly once.
//! - Dispatches every inbound message sequentially across plugins in
//!   registration order, applying the gating rules (staleness, mute,
//!   bot-sender) and the trigger precedence within each plugin.
//! - Isolates plugin faults: a failing hook is logged, mirrored to the
//!   operator alert channel, and — for `run` only — answered to the user
//!   with the localized generic failure message. Remaining plugins always
//!   still see the message.
//! - Applies resolved locale bundles by publishing each plugin's fully
//!   merged command/string state in one atomic swap, then invoking the
//!   plugin's `after_translation` hook.
//!
//! Cross-plugin matches are independent: a message matching commands in
//! two plugins runs both handlers. Within one plugin the first declared
//! matching command wins and the rest of that plugin's registry is
//! skipped.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{Instrument, Level, debug, error, info, span, trace, warn};

use braid_core::command::CommandSet;
use braid_core::input;
use braid_core::message::{IncomingMessage, MessageKind};
use braid_core::trigger::{MatchScope, TriggerCache, TriggerSet};

use crate::context::DispatchContext;
use crate::error::PluginError;
use crate::overlay::ResolvedBundle;
use crate::plugin::{Capabilities, Plugin, PluginCtx};
use crate::stores::StringTable;

/// Messages older than this are dropped before any hook runs, unless they
/// are inline queries — guards against replaying backfilled history into
/// side-effecting commands.
pub const MAX_MESSAGE_AGE: Duration = Duration::from_secs(300);

/// Tag that mutes command handling for a sender or conversation.
pub const MUTED_TAG: &str = "muted";

/// Tag that suppresses friendly-pattern matches for a sender or
/// conversation.
pub const NO_REPLIES_TAG: &str = "noreplies";

struct PluginEntry {
    name: Arc<str>,
    plugin: Arc<dyn Plugin>,
    caps: Capabilities,
    commands: Arc<CommandSet>,
    strings: Arc<StringTable>,
    schedule: Option<String>,
    triggers: TriggerCache,
}

/// Central plugin registry and dispatcher.
pub struct PluginHost {
    context: Arc<DispatchContext>,
    plugins: RwLock<Vec<Arc<PluginEntry>>>,
}

impl PluginHost {
    pub fn new(context: DispatchContext) -> Self {
        Self {
            context: Arc::new(context),
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// The shared dispatch context.
    pub fn context(&self) -> &DispatchContext {
        &self.context
    }

    /// Registers a plugin, instantiating its manifest into live state.
    ///
    /// Registration order is dispatch order.
    pub fn register<P: Plugin + 'static>(&self, plugin: P) {
        self.register_arc(Arc::new(plugin));
    }

    pub fn register_arc(&self, plugin: Arc<dyn Plugin>) {
        let manifest = plugin.manifest();
        let caps = plugin.capabilities();
        let entry = Arc::new(PluginEntry {
            name: manifest.name.into(),
            caps,
            commands: Arc::new(CommandSet::new(manifest.commands)),
            strings: Arc::new(StringTable::new(manifest.strings)),
            schedule: manifest.schedule,
            triggers: TriggerCache::new(),
            plugin,
        });
        info!(plugin = %entry.name, "Plugin registered");
        self.plugins.write().push(entry);
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    /// `(plugin name, cron expression)` pairs for the external scheduler.
    pub fn schedules(&self) -> Vec<(String, String)> {
        self.plugins
            .read()
            .iter()
            .filter(|entry| entry.caps.cron)
            .filter_map(|entry| {
                entry
                    .schedule
                    .as_ref()
                    .map(|expr| (entry.name.to_string(), expr.clone()))
            })
            .collect()
    }

    fn ctx(&self, entry: &PluginEntry) -> PluginCtx {
        PluginCtx {
            name: Arc::clone(&entry.name),
            commands: Arc::clone(&entry.commands),
            strings: Arc::clone(&entry.strings),
            shared: Arc::clone(&self.context),
        }
    }

    fn entries(&self) -> Vec<Arc<PluginEntry>> {
        self.plugins.read().iter().cloned().collect()
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Routes one inbound message through every registered plugin.
    ///
    /// Never propagates plugin faults; see the module docs for the gating
    /// and isolation rules.
    pub async fn dispatch(&self, message: IncomingMessage) {
        let Some(content) = message.content.clone().filter(|c| !c.is_empty()) else {
            trace!(message = %message.id, "No textual content, message dropped");
            return;
        };

        if is_stale(&message) {
            debug!(
                message = %message.id,
                kind = ?message.kind,
                "Message older than {}s, dropped",
                MAX_MESSAGE_AGE.as_secs()
            );
            return;
        }

        let span = span!(
            Level::DEBUG,
            "dispatch",
            message = %message.id,
            conversation = %message.conversation.id
        );
        self.dispatch_message(message, content).instrument(span).await;
    }

    async fn dispatch_message(&self, message: IncomingMessage, content: String) {
        let ignore_commands = self.ignore_commands(&message).await;
        let scope = MatchScope {
            allow_friendly: !ignore_commands && self.allow_friendly(&message).await,
        };
        let trigger_config = self.context.trigger_config();

        for entry in self.entries() {
            if entry.caps.always
                && let Err(failure) = entry.plugin.always(self.ctx(&entry), &message).await
            {
                self.report_failure(&entry.name, "always", &failure, None)
                    .await;
            }

            if ignore_commands || !entry.caps.commands {
                continue;
            }

            let revision = entry.commands.revision();
            let snapshot = entry.commands.snapshot();
            for (index, command) in snapshot.iter().enumerate() {
                let Some(triggers) = entry.triggers.get_or_compile(revision, index, || {
                    TriggerSet::compile(command, &trigger_config)
                }) else {
                    continue;
                };
                let Some(hit) = triggers.first_match(&content, &trigger_config, scope) else {
                    continue;
                };

                debug!(
                    plugin = %entry.name,
                    command = %command.command,
                    kind = ?hit.kind,
                    "Trigger matched"
                );

                let mut matched = message.clone();
                input::extract(&mut matched, &hit);

                if let Err(failure) = entry.plugin.run(self.ctx(&entry), matched).await {
                    self.report_failure(
                        &entry.name,
                        "run",
                        &failure,
                        Some(&message.conversation.id),
                    )
                    .await;
                }

                // First matching command wins within this plugin; other
                // plugins are still scanned independently.
                break;
            }
        }
    }

    /// Invokes the cron hook of every cron-capable plugin.
    pub async fn run_cron(&self) {
        for entry in self.entries() {
            if !entry.caps.cron {
                continue;
            }
            if let Err(failure) = entry.plugin.cron(self.ctx(&entry)).await {
                self.report_failure(&entry.name, "cron", &failure, None).await;
            }
        }
    }

    /// Invokes the cron hook of one plugin by name.
    pub async fn run_cron_for(&self, name: &str) {
        for entry in self.entries() {
            if entry.caps.cron && *entry.name == *name {
                if let Err(failure) = entry.plugin.cron(self.ctx(&entry)).await {
                    self.report_failure(&entry.name, "cron", &failure, None).await;
                }
                return;
            }
        }
        warn!(plugin = name, "No cron-capable plugin with that name");
    }

    /// Routes an externally received webhook payload to every
    /// webhook-capable plugin, concurrently.
    pub async fn dispatch_webhook(&self, path: &str, payload: &Value) {
        let entries = self.entries();
        let outcomes = future::join_all(entries.iter().filter(|e| e.caps.webhook).map(|entry| {
            let ctx = self.ctx(entry);
            async move { (Arc::clone(&entry.name), entry.plugin.webhook(ctx, path, payload).await) }
        }))
        .await;

        for (name, outcome) in outcomes {
            if let Err(failure) = outcome {
                self.report_failure(&name, "webhook", &failure, None).await;
            }
        }
    }

    // ─── Gating ──────────────────────────────────────────────────────────────

    async fn ignore_commands(&self, message: &IncomingMessage) -> bool {
        if message.kind != MessageKind::Text || message.sender.is_bot {
            return true;
        }
        let uid = &message.sender.id;
        let permissions = &self.context.permissions;
        if permissions.is_owner(uid).await || permissions.is_trusted(uid).await {
            return false;
        }
        let tags = &self.context.tags;
        tags.has_tag(&message.conversation.id, MUTED_TAG).await
            || tags.has_tag(uid, MUTED_TAG).await
    }

    async fn allow_friendly(&self, message: &IncomingMessage) -> bool {
        if self.context.alert_conversation.as_deref() == Some(message.conversation.id.as_str()) {
            return false;
        }
        let tags = &self.context.tags;
        !(tags
            .has_tag(&message.conversation.id, NO_REPLIES_TAG)
            .await
            || tags.has_tag(&message.sender.id, NO_REPLIES_TAG).await)
    }

    // ─── Failure reporting ───────────────────────────────────────────────────

    async fn report_failure(
        &self,
        plugin: &str,
        hook: &str,
        failure: &PluginError,
        reply_to: Option<&str>,
    ) {
        error!(plugin, hook, error = %failure, "Plugin hook failed");
        self.context
            .alerts
            .alert(&format!("{hook} failed in plugin '{plugin}': {failure}"))
            .await;

        if let Some(conversation) = reply_to {
            let generic = self.context.errors.snapshot().generic.clone();
            if let Err(send_failure) = self.context.responder.send_text(conversation, &generic).await
            {
                warn!(conversation, error = %send_failure, "Failure reply could not be sent");
            }
        }
    }

    // ─── Translation overlay application ─────────────────────────────────────

    /// Applies a resolved locale bundle to the live plugin state.
    ///
    /// Each named plugin's command list and string table are merged off to
    /// the side and published in one swap, so concurrent dispatches only
    /// ever observe the old or the new generation, never a half-applied
    /// one. Re-applying an identical bundle is idempotent.
    pub fn apply_bundle(&self, bundle: &ResolvedBundle) {
        if let Some(errors) = &bundle.errors {
            self.context.errors.publish(errors.clone());
        }

        let entries = self.entries();
        for (name, over) in &bundle.plugins {
            let Some(entry) = entries.iter().find(|entry| *entry.name == **name) else {
                warn!(plugin = %name, locale = %bundle.locale, "Bundle names an unregistered plugin");
                continue;
            };

            if !over.strings.is_empty() {
                let mut merged = (*entry.strings.snapshot()).clone();
                merged.extend(over.strings.iter().map(|(k, v)| (k.clone(), v.clone())));
                entry.strings.publish(merged);
            }

            if !over.commands.is_empty() {
                let mut commands = (*entry.commands.snapshot()).clone();
                for (index, command_over) in over.commands.iter().enumerate() {
                    match commands.get_mut(index) {
                        Some(target) => command_over.apply_to(target),
                        None => commands.push(command_over.to_command()),
                    }
                }
                entry.commands.publish(commands);
            }

            if entry.caps.after_translation {
                entry.plugin.after_translation(self.ctx(entry));
            }

            debug!(plugin = %name, locale = %bundle.locale, "Bundle applied");
        }
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("plugin_count", &self.plugin_count())
            .finish_non_exhaustive()
    }
}

fn is_stale(message: &IncomingMessage) -> bool {
    message.kind != MessageKind::InlineQuery
        && message
            .date
            .elapsed()
            .is_ok_and(|age| age > MAX_MESSAGE_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    use async_trait::async_trait;

    use braid_core::command::{Command, CommandOverride, Parameter};
    use braid_core::message::{Conversation, User};

    use crate::error::PluginResult;
    use crate::overlay::{LocaleCatalog, PluginOverride, TranslationBundle};
    use crate::plugin::PluginManifest;
    use crate::stores::{ErrorMessages, Permissions, Responder, AlertSink, TagStore, tag_matches};

    // ─── Fakes ───────────────────────────────────────────────────────────────

    struct StaticPermissions {
        owner: Option<String>,
        trusted: Vec<String>,
    }

    #[async_trait]
    impl Permissions for StaticPermissions {
        async fn is_owner(&self, uid: &str) -> bool {
            self.owner.as_deref() == Some(uid)
        }

        async fn is_trusted(&self, uid: &str) -> bool {
            self.trusted.iter().any(|t| t == uid)
        }

        async fn is_admin(&self, _uid: &str) -> bool {
            false
        }
    }

    struct MemoryTags(HashMap<String, Vec<String>>);

    #[async_trait]
    impl TagStore for MemoryTags {
        async fn has_tag(&self, target: &str, pattern: &str) -> bool {
            self.0
                .get(target)
                .is_some_and(|tags| tags.iter().any(|tag| tag_matches(tag, pattern)))
        }
    }

    #[derive(Default)]
    struct Recorder {
        replies: Mutex<Vec<(String, String)>>,
        alerts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Responder for Recorder {
        async fn send_text(&self, conversation: &str, text: &str) -> PluginResult<()> {
            self.replies
                .lock()
                .unwrap()
                .push((conversation.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl AlertSink for Recorder {
        async fn alert(&self, text: &str) {
            self.alerts.lock().unwrap().push(text.to_string());
        }
    }

    #[derive(Default)]
    struct Counters {
        runs: AtomicUsize,
        always: AtomicUsize,
        crons: AtomicUsize,
        webhooks: AtomicUsize,
        retranslations: AtomicUsize,
        last_input: Mutex<Option<Option<String>>>,
    }

    struct TestPlugin {
        name: String,
        commands: Vec<Command>,
        caps: Capabilities,
        counters: Arc<Counters>,
        fail_run: bool,
        fail_always: bool,
    }

    impl TestPlugin {
        fn new(name: &str, commands: Vec<Command>) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let plugin = Self {
                name: name.to_string(),
                commands,
                caps: Capabilities {
                    commands: true,
                    always: true,
                    cron: false,
                    webhook: false,
                    after_translation: false,
                },
                counters: Arc::clone(&counters),
                fail_run: false,
                fail_always: false,
            };
            (plugin, counters)
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn manifest(&self) -> PluginManifest {
            PluginManifest {
                name: self.name.clone(),
                commands: self.commands.clone(),
                strings: HashMap::from([("greeting".into(), "hello".into())]),
                schedule: self.caps.cron.then(|| "*/5 * * * *".to_string()),
            }
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        async fn run(&self, _ctx: PluginCtx, message: IncomingMessage) -> PluginResult<()> {
            self.counters.runs.fetch_add(1, Ordering::SeqCst);
            *self.counters.last_input.lock().unwrap() =
                Some(message.input(true).map(str::to_string));
            if self.fail_run {
                return Err(PluginError::msg("boom"));
            }
            Ok(())
        }

        async fn always(&self, _ctx: PluginCtx, _message: &IncomingMessage) -> PluginResult<()> {
            self.counters.always.fetch_add(1, Ordering::SeqCst);
            if self.fail_always {
                return Err(PluginError::msg("passive boom"));
            }
            Ok(())
        }

        async fn cron(&self, _ctx: PluginCtx) -> PluginResult<()> {
            self.counters.crons.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn webhook(&self, _ctx: PluginCtx, _path: &str, _payload: &Value) -> PluginResult<()> {
            self.counters.webhooks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn after_translation(&self, _ctx: PluginCtx) {
            self.counters.retranslations.fetch_add(1, Ordering::SeqCst);
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn host() -> PluginHost {
        PluginHost::new(DispatchContext::builder("testbot").build())
    }

    fn host_with(recorder: Arc<Recorder>, tags: MemoryTags) -> PluginHost {
        PluginHost::new(
            DispatchContext::builder("testbot")
                .permissions(Arc::new(StaticPermissions {
                    owner: Some("owner".into()),
                    trusted: vec!["friend".into()],
                }))
                .tags(Arc::new(tags))
                .responder(Arc::clone(&recorder) as Arc<dyn Responder>)
                .alerts(recorder as Arc<dyn AlertSink>)
                .build(),
        )
    }

    fn text_message(content: &str) -> IncomingMessage {
        IncomingMessage::text(
            "m1",
            Conversation::new("c1"),
            User::new("u1", "Ada"),
            content,
        )
    }

    fn weather_command() -> Command {
        Command::new("/weather")
            .parameter(Parameter::optional("place"))
            .description("weather report")
    }

    // ─── Dispatch properties ─────────────────────────────────────────────────

    #[tokio::test]
    async fn end_to_end_weather_with_and_without_argument() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("weather", vec![weather_command()]);
        host.register(plugin);

        host.dispatch(text_message("/weather Madrid")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            counters.last_input.lock().unwrap().clone(),
            Some(Some("Madrid".to_string()))
        );

        host.dispatch(text_message("/weather")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
        assert_eq!(counters.last_input.lock().unwrap().clone(), Some(None));
    }

    #[tokio::test]
    async fn both_plugins_run_when_both_match() {
        let host = host();
        let (first, first_counters) = TestPlugin::new("one", vec![Command::new("/hi")]);
        let (second, second_counters) = TestPlugin::new("two", vec![Command::new("/hi")]);
        host.register(first);
        host.register(second);

        host.dispatch(text_message("/hi")).await;

        assert_eq!(first_counters.runs.load(Ordering::SeqCst), 1);
        assert_eq!(second_counters.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_matching_command_wins_within_a_plugin() {
        let host = host();
        let (plugin, counters) = TestPlugin::new(
            "dup",
            vec![Command::new("/hi"), Command::new("/hi")],
        );
        host.register(plugin);

        host.dispatch(text_message("/hi")).await;

        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_text_message_is_dropped_entirely() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        let mut message = text_message("/hi");
        message.date = SystemTime::now() - Duration::from_secs(400);
        host.dispatch(message).await;

        assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
        assert_eq!(counters.always.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_inline_query_is_not_dropped_by_age() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        let mut message = text_message("/hi");
        message.kind = MessageKind::InlineQuery;
        message.date = SystemTime::now() - Duration::from_secs(400);
        host.dispatch(message).await;

        // Not dropped: the passive hook sees it. Commands are still
        // ignored because the message is not plain text.
        assert_eq!(counters.always.load(Ordering::SeqCst), 1);
        assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn muted_sender_skips_run_but_not_always() {
        let recorder = Arc::new(Recorder::default());
        let host = host_with(
            Arc::clone(&recorder),
            MemoryTags(HashMap::from([("u1".to_string(), vec!["muted".to_string()])])),
        );
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        host.dispatch(text_message("/hi")).await;

        assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
        assert_eq!(counters.always.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trusted_sender_bypasses_mute() {
        let recorder = Arc::new(Recorder::default());
        let host = host_with(
            Arc::clone(&recorder),
            MemoryTags(HashMap::from([("friend".to_string(), vec!["muted".to_string()])])),
        );
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        let mut message = text_message("/hi");
        message.sender = User::new("friend", "Kim");
        host.dispatch(message).await;

        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bot_senders_never_trigger_commands() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        let mut message = text_message("/hi");
        message.sender.is_bot = true;
        host.dispatch(message).await;

        assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
        assert_eq!(counters.always.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_content_drops_even_passive_hooks() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("p", vec![Command::new("/hi")]);
        host.register(plugin);

        let mut message = text_message("");
        message.kind = MessageKind::Photo;
        message.content = None;
        host.dispatch(message).await;

        assert_eq!(counters.always.load(Ordering::SeqCst), 0);
    }

    // ─── Fault isolation ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_failure_alerts_replies_and_spares_other_plugins() {
        let recorder = Arc::new(Recorder::default());
        let host = host_with(Arc::clone(&recorder), MemoryTags(HashMap::new()));

        let (mut failing, _) = TestPlugin::new("bad", vec![Command::new("/hi")]);
        failing.fail_run = true;
        let (healthy, healthy_counters) = TestPlugin::new("good", vec![Command::new("/hi")]);
        host.register(failing);
        host.register(healthy);

        host.dispatch(text_message("/hi")).await;

        assert_eq!(healthy_counters.runs.load(Ordering::SeqCst), 1);

        let alerts = recorder.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("bad"));

        let replies = recorder.replies.lock().unwrap();
        assert_eq!(
            replies.as_slice(),
            &[("c1".to_string(), ErrorMessages::default().generic)]
        );
    }

    #[tokio::test]
    async fn always_failure_alerts_without_user_reply() {
        let recorder = Arc::new(Recorder::default());
        let host = host_with(Arc::clone(&recorder), MemoryTags(HashMap::new()));

        let (mut failing, _) = TestPlugin::new("bad", vec![]);
        failing.fail_always = true;
        failing.caps.commands = false;
        let (healthy, healthy_counters) = TestPlugin::new("good", vec![Command::new("/hi")]);
        host.register(failing);
        host.register(healthy);

        host.dispatch(text_message("/hi")).await;

        assert_eq!(healthy_counters.runs.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.alerts.lock().unwrap().len(), 1);
        assert!(recorder.replies.lock().unwrap().is_empty());
    }

    // ─── Friendly gating ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn friendly_is_suppressed_in_alert_channel_and_by_tag() {
        let recorder = Arc::new(Recorder::default());
        let context = DispatchContext::builder("testbot")
            .alert_conversation("alerts")
            .tags(Arc::new(MemoryTags(HashMap::from([(
                "quiet".to_string(),
                vec!["noreplies".to_string()],
            )]))))
            .responder(Arc::clone(&recorder) as Arc<dyn Responder>)
            .alerts(recorder as Arc<dyn AlertSink>)
            .build();
        let host = PluginHost::new(context);

        let command = Command::new("/weather").friendly("weather");
        let (plugin, counters) = TestPlugin::new("weather", vec![command]);
        host.register(plugin);

        // Plain conversation: friendly fires.
        host.dispatch(text_message("nice weather today")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);

        // Alert channel: suppressed.
        let mut in_alerts = text_message("nice weather today");
        in_alerts.conversation = Conversation::new("alerts");
        host.dispatch(in_alerts).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);

        // Tagged conversation: suppressed.
        let mut tagged = text_message("nice weather today");
        tagged.conversation = Conversation::new("quiet");
        host.dispatch(tagged).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);

        // The canonical form still works everywhere.
        let mut canonical = text_message("/weather");
        canonical.conversation = Conversation::new("alerts");
        host.dispatch(canonical).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
    }

    // ─── Overlay application ─────────────────────────────────────────────────

    fn translation_catalog() -> LocaleCatalog {
        let catalog = LocaleCatalog::new();
        catalog.insert("default", TranslationBundle::default());
        catalog.insert(
            "es",
            TranslationBundle {
                extends: Some("default".into()),
                errors: Some(ErrorMessages {
                    generic: "Algo salió mal.".into(),
                    ..Default::default()
                }),
                plugins: HashMap::from([(
                    "weather".to_string(),
                    PluginOverride {
                        commands: vec![CommandOverride {
                            command: Some("/tiempo".into()),
                            description: Some("el tiempo".into()),
                            ..Default::default()
                        }],
                        strings: HashMap::from([("greeting".into(), "hola".into())]),
                    },
                )]),
                ..Default::default()
            },
        );
        catalog
    }

    #[tokio::test]
    async fn applied_bundle_rewrites_vocabulary_and_strings() {
        let host = host();
        let (mut plugin, counters) = TestPlugin::new("weather", vec![weather_command()]);
        plugin.caps.after_translation = true;
        host.register(plugin);

        let resolved = translation_catalog().resolve("es").expect("resolves");
        host.apply_bundle(&resolved);

        assert_eq!(counters.retranslations.load(Ordering::SeqCst), 1);
        assert_eq!(host.context().errors.snapshot().generic, "Algo salió mal.");

        // The rewritten token matches, the old one no longer does.
        host.dispatch(text_message("/tiempo Madrid")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
        host.dispatch(text_message("/weather Madrid")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reapplying_a_bundle_is_idempotent() {
        let host = host();
        let (plugin, _) = TestPlugin::new("weather", vec![weather_command()]);
        host.register(plugin);

        let resolved = translation_catalog().resolve("es").expect("resolves");
        host.apply_bundle(&resolved);

        let entries = host.entries();
        let entry = &entries[0];
        let commands_after_first = entry.commands.snapshot();
        let strings_after_first = entry.strings.snapshot();

        host.apply_bundle(&resolved);

        assert_eq!(*entry.commands.snapshot(), *commands_after_first);
        assert_eq!(*entry.strings.snapshot(), *strings_after_first);
    }

    #[tokio::test]
    async fn bundle_creates_missing_command_slots() {
        let host = host();
        let (plugin, counters) = TestPlugin::new("extra", vec![Command::new("/one")]);
        host.register(plugin);

        let bundle = ResolvedBundle {
            locale: "default".into(),
            errors: None,
            plugins: HashMap::from([(
                "extra".to_string(),
                PluginOverride {
                    commands: vec![
                        CommandOverride::default(),
                        CommandOverride {
                            command: Some("/two".into()),
                            ..Default::default()
                        },
                    ],
                    strings: HashMap::new(),
                },
            )]),
        };
        host.apply_bundle(&bundle);

        host.dispatch(text_message("/two")).await;
        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    }

    // ─── Cron and webhook contracts ──────────────────────────────────────────

    #[tokio::test]
    async fn cron_and_webhook_reach_only_capable_plugins() {
        let host = host();
        let (mut scheduled, scheduled_counters) = TestPlugin::new("jobs", vec![]);
        scheduled.caps = Capabilities {
            commands: false,
            always: false,
            cron: true,
            webhook: true,
            after_translation: false,
        };
        let (plain, plain_counters) = TestPlugin::new("plain", vec![Command::new("/hi")]);
        host.register(scheduled);
        host.register(plain);

        host.run_cron().await;
        host.dispatch_webhook("jobs/ping", &Value::Null).await;

        assert_eq!(scheduled_counters.crons.load(Ordering::SeqCst), 1);
        assert_eq!(scheduled_counters.webhooks.load(Ordering::SeqCst), 1);
        assert_eq!(plain_counters.crons.load(Ordering::SeqCst), 0);
        assert_eq!(plain_counters.webhooks.load(Ordering::SeqCst), 0);

        assert_eq!(
            host.schedules(),
            vec![("jobs".to_string(), "*/5 * * * *".to_string())]
        );
    }
}
