//! Scoped subscription to a channel's inbound event source.
//!
//! Starting while already listening keeps the existing subscription; stopping
//! when not listening does nothing. Once `stop` returns, no further envelope is
//! dispatched through that subscription. A dispatch already in progress (for
//! instance a delegate that stops listening from its own callback) runs to
//! completion; the loop exits right after it. An idle loop is aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use envbus_core::error::{BusError, Result};
use envbus_core::protocol::RawEnvelope;

use crate::channel::ChannelAdapter;
use crate::handler::Role;
use crate::obs::BusMetrics;

/// Something that consumes inbound envelopes in arrival order.
#[async_trait]
pub(crate) trait Dispatch: Send + Sync + 'static {
    async fn dispatch(self: Arc<Self>, raw: RawEnvelope);
}

#[derive(Default)]
struct Flags {
    active: AtomicBool,
    dispatching: AtomicBool,
}

struct Subscription {
    flags: Arc<Flags>,
    task: JoinHandle<()>,
}

impl Subscription {
    fn close(self) {
        self.flags.active.store(false, Ordering::SeqCst);
        // A running dispatch sees `active` down once it returns and ends the
        // loop itself.
        if !self.flags.dispatching.load(Ordering::SeqCst) {
            self.task.abort();
        }
    }
}

pub(crate) struct Listener {
    role: Role,
    metrics: Arc<BusMetrics>,
    current: Mutex<Option<Subscription>>,
}

impl Listener {
    pub(crate) fn new(role: Role, metrics: Arc<BusMetrics>) -> Self {
        Self {
            role,
            metrics,
            current: Mutex::new(None),
        }
    }

    pub(crate) fn is_listening(&self) -> bool {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    /// Subscribe and spawn the dispatch loop. Returns false if already listening.
    ///
    /// The loop only holds a weak reference to `target`, so a dropped handler
    /// ends its own subscription.
    pub(crate) fn start<D: Dispatch>(
        &self,
        channel: &dyn ChannelAdapter,
        target: Weak<D>,
    ) -> Result<bool> {
        let rt = Handle::try_current()
            .map_err(|_| BusError::Internal("start_listening needs a tokio runtime".into()))?;

        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Ok(false);
        }

        let mut inbox = channel.subscribe();
        let flags = Arc::new(Flags::default());
        flags.active.store(true, Ordering::SeqCst);
        let loop_flags = Arc::clone(&flags);
        let role = self.role;

        let task = rt.spawn(async move {
            while loop_flags.active.load(Ordering::SeqCst) {
                let raw = match inbox.recv().await {
                    Ok(raw) => raw,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(role = role.as_str(), skipped = n, "inbound lagged; envelopes lost");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!(role = role.as_str(), "inbound closed");
                        break;
                    }
                };

                loop_flags.dispatching.store(true, Ordering::SeqCst);
                if !loop_flags.active.load(Ordering::SeqCst) {
                    break;
                }
                let Some(target) = target.upgrade() else {
                    break;
                };
                target.dispatch(raw).await;
                loop_flags.dispatching.store(false, Ordering::SeqCst);
            }
        });

        *guard = Some(Subscription { flags, task });
        self.metrics.listeners_active.inc(&[("role", role.as_str())]);
        Ok(true)
    }

    /// Returns false if there was nothing to stop.
    pub(crate) fn stop(&self) -> bool {
        let sub = {
            let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        match sub {
            Some(sub) => {
                sub.close();
                self.metrics.listeners_active.dec(&[("role", self.role.as_str())]);
                true
            }
            None => false,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self.stop() {
            tracing::debug!(role = self.role.as_str(), "listener dropped while listening");
        }
    }
}
