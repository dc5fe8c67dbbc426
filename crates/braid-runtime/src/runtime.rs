//! Main runtime orchestration.
//!
//! [`BraidRuntime`] wires the pieces together: it builds the dispatch
//! context from configuration and the injected [`Collaborators`], owns
//! the [`PluginHost`] and the [`LocaleCatalog`], and runs the bounded
//! ingest worker until shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use braid_runtime::BraidRuntime;
//!
//! // Auto-loads braid.toml from the current/user config directory
//! let runtime = BraidRuntime::builder().build()?;
//! runtime.host().register(WeatherPlugin::new());
//!
//! // Hand the sender to your platform connectors
//! let sender = runtime.sender();
//!
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use braid_core::message::IncomingMessage;
use braid_framework::context::DispatchContext;
use braid_framework::host::PluginHost;
use braid_framework::overlay::{LocaleCatalog, TranslationBundle};
use braid_framework::stores::{AlertSink, Permissions, Responder, TagStore};

use crate::config::{BraidConfig, ConfigLoader, ConfigResult, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::ingest::{self, MessageSender};
use crate::logging;

/// The external collaborator implementations injected into the dispatcher.
///
/// Everything is optional; unset seams fall back to the framework's
/// log-only / deny-all defaults, which is convenient for tests and early
/// bring-up.
#[derive(Default)]
pub struct Collaborators {
    pub permissions: Option<Arc<dyn Permissions>>,
    pub tags: Option<Arc<dyn TagStore>>,
    pub responder: Option<Arc<dyn Responder>>,
    pub alerts: Option<Arc<dyn AlertSink>>,
}

/// The main Braid runtime.
pub struct BraidRuntime {
    config: BraidConfig,
    host: Arc<PluginHost>,
    catalog: LocaleCatalog,
    sender: MessageSender,
    /// Consumed by `start`.
    receiver: Mutex<Option<mpsc::Receiver<IncomingMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl BraidRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and collaborators.
    ///
    /// Initializes logging from the configuration; double initialization
    /// is tolerated.
    pub fn from_config(config: BraidConfig, collaborators: Collaborators) -> Self {
        logging::init_from_config(&config.logging);

        let mut context = DispatchContext::builder(config.bot.username.clone())
            .prefix(config.bot.prefix.clone());
        if let Some(alert) = &config.bot.alert_conversation {
            context = context.alert_conversation(alert.clone());
        }
        if let Some(permissions) = collaborators.permissions {
            context = context.permissions(permissions);
        }
        if let Some(tags) = collaborators.tags {
            context = context.tags(tags);
        }
        if let Some(responder) = collaborators.responder {
            context = context.responder(responder);
        }
        if let Some(alerts) = collaborators.alerts {
            context = context.alerts(alerts);
        }

        let host = Arc::new(PluginHost::new(context.build()));
        let (sender, receiver) = ingest::channel(config.ingest.queue_size);

        info!(
            username = %config.bot.username,
            prefix = %config.bot.prefix,
            locale = %config.bot.locale,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            host,
            catalog: LocaleCatalog::new(),
            sender,
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BraidConfig {
        &self.config
    }

    /// The plugin host; register plugins here.
    pub fn host(&self) -> &Arc<PluginHost> {
        &self.host
    }

    /// A cloneable handle connectors push normalized messages into.
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    // ─── Locales ─────────────────────────────────────────────────────────────

    /// Registers (or replaces) a locale bundle.
    pub fn register_locale(&self, locale: impl Into<String>, bundle: TranslationBundle) {
        self.catalog.insert(locale, bundle);
    }

    /// Resolves a locale's inheritance chain and applies it to live
    /// plugin state. This is the "translations changed" entry point; call
    /// it again whenever bundles are edited at runtime.
    pub fn apply_locale(&self, locale: &str) -> RuntimeResult<()> {
        let resolved = self.catalog.resolve(locale)?;
        self.host.apply_bundle(&resolved);
        info!(locale, "Locale applied");
        Ok(())
    }

    // ─── External invocation contracts ───────────────────────────────────────

    /// Invokes every cron-capable plugin; driven by an external scheduler.
    pub async fn trigger_cron(&self) {
        self.host.run_cron().await;
    }

    /// Routes a webhook payload received by the external listener.
    pub async fn webhook(&self, path: &str, payload: &serde_json::Value) {
        self.host.dispatch_webhook(path, payload).await;
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Starts the ingest worker and applies the configured locale.
    pub fn start(&self) -> RuntimeResult<()> {
        let Some(receiver) = self.receiver.lock().take() else {
            return Err(RuntimeError::AlreadyRunning);
        };

        if self.catalog.contains(&self.config.bot.locale) {
            self.apply_locale(&self.config.bot.locale)?;
        } else if self.config.bot.locale != "default" {
            warn!(
                locale = %self.config.bot.locale,
                "Configured locale has no registered bundle"
            );
        }

        let handle = ingest::spawn_worker(
            Arc::clone(&self.host),
            receiver,
            self.cancel.clone(),
        );
        *self.worker.lock() = Some(handle);

        info!("Runtime started");
        Ok(())
    }

    /// Stops the ingest worker.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C / SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start()?;
        info!("Braid runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.shutdown().await;
        Ok(())
    }

    /// Runs until the given future completes.
    pub async fn run_until<F>(&self, stop: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.start()?;
        stop.await;
        self.shutdown().await;
        Ok(())
    }
}

impl std::fmt::Debug for BraidRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraidRuntime")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BraidRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = BraidRuntime::builder()
///     .config_file("config/braid.toml")
///     .profile("production")
///     .permissions(my_permissions)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    collaborators: Collaborators,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new().with_current_dir().with_user_dir(),
            collaborators: Collaborators::default(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BraidConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.collaborators.permissions = Some(permissions);
        self
    }

    pub fn tags(mut self, tags: Arc<dyn TagStore>) -> Self {
        self.collaborators.tags = Some(tags);
        self
    }

    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.collaborators.responder = Some(responder);
        self
    }

    pub fn alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.collaborators.alerts = Some(alerts);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<BraidRuntime> {
        let config = self.loader.load()?;
        validate_config(&config)?;
        Ok(BraidRuntime::from_config(config, self.collaborators))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use braid_core::command::Command;
    use braid_core::message::{Conversation, User};
    use braid_framework::error::PluginResult;
    use braid_framework::plugin::{Capabilities, Plugin, PluginCtx, PluginManifest};

    struct EchoPlugin {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for EchoPlugin {
        fn manifest(&self) -> PluginManifest {
            PluginManifest {
                name: "echo".into(),
                commands: vec![Command::new("/echo")],
                strings: HashMap::new(),
                schedule: None,
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::COMMANDS
        }

        async fn run(&self, _ctx: PluginCtx, _message: IncomingMessage) -> PluginResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_runtime() -> BraidRuntime {
        BraidRuntime::from_config(BraidConfig::default(), Collaborators::default())
    }

    #[tokio::test]
    async fn messages_flow_from_sender_to_plugins() {
        let runtime = test_runtime();
        let runs = Arc::new(AtomicUsize::new(0));
        runtime.host().register(EchoPlugin {
            runs: Arc::clone(&runs),
        });

        runtime.start().expect("starts");
        assert!(runtime.is_running());

        let message = IncomingMessage::text(
            "m1",
            Conversation::new("c1"),
            User::new("u1", "Ada"),
            "/echo",
        );
        runtime.sender().send(message).await.expect("enqueued");

        // The worker dispatches asynchronously; poll briefly.
        for _ in 0..100 {
            if runs.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        runtime.shutdown().await;
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn starting_twice_is_an_error() {
        let runtime = test_runtime();
        runtime.start().expect("starts");
        assert!(matches!(
            runtime.start(),
            Err(RuntimeError::AlreadyRunning)
        ));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn configured_locale_applies_at_start() {
        let mut config = BraidConfig::default();
        config.bot.locale = "es".to_string();
        let runtime = BraidRuntime::from_config(config, Collaborators::default());
        runtime.host().register(EchoPlugin {
            runs: Arc::new(AtomicUsize::new(0)),
        });

        runtime.register_locale(
            "es",
            TranslationBundle {
                errors: Some(braid_framework::stores::ErrorMessages {
                    generic: "Algo salió mal.".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        runtime.start().expect("starts");
        assert_eq!(
            runtime.host().context().errors.snapshot().generic,
            "Algo salió mal."
        );
        runtime.shutdown().await;
    }

    #[test]
    fn unknown_locale_resolution_fails() {
        let runtime = test_runtime();
        assert!(runtime.apply_locale("nope").is_err());
    }
}
