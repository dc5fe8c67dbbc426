//! Inbound message wiring.
//!
//! Platform connectors hand normalized messages to a [`MessageSender`];
//! a worker task receives them from a **bounded** queue and spawns one
//! dispatch per message, so a slow handler never delays later messages.
//!
//! Back-pressure policy: the queue is bounded and `send` awaits when it
//! is full — the upstream connector blocks instead of the runtime
//! dropping messages. Connectors that prefer shedding can use
//! [`MessageSender::try_send`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use braid_core::message::IncomingMessage;
use braid_framework::host::PluginHost;

use crate::error::{RuntimeError, RuntimeResult};

/// Producer half of the ingest queue, handed to platform connectors.
#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::Sender<IncomingMessage>,
}

impl MessageSender {
    /// Enqueues one message, awaiting while the queue is full.
    pub async fn send(&self, message: IncomingMessage) -> RuntimeResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| RuntimeError::IngestClosed)
    }

    /// Enqueues without waiting; fails when the queue is full or closed.
    pub fn try_send(&self, message: IncomingMessage) -> RuntimeResult<()> {
        use mpsc::error::TrySendError;
        self.tx.try_send(message).map_err(|error| match error {
            TrySendError::Full(_) => RuntimeError::IngestFull,
            TrySendError::Closed(_) => RuntimeError::IngestClosed,
        })
    }
}

/// Creates the bounded ingest channel.
pub fn channel(capacity: usize) -> (MessageSender, mpsc::Receiver<IncomingMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (MessageSender { tx }, rx)
}

/// Spawns the worker draining the queue into [`PluginHost::dispatch`].
///
/// Each message gets its own task, so dispatches for different messages
/// interleave freely. The worker exits when cancelled or when every
/// sender is dropped.
pub fn spawn_worker(
    host: Arc<PluginHost>,
    mut rx: mpsc::Receiver<IncomingMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(message) => {
                        trace!(message = %message.id, "Message dequeued");
                        let host = Arc::clone(&host);
                        tokio::spawn(async move {
                            host.dispatch(message).await;
                        });
                    }
                    None => break,
                },
            }
        }
        debug!("Ingest worker stopped");
    })
}
