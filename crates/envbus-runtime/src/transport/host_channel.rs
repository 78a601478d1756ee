//! `ChannelAdapter` over the editor's WebSocket session.
//!
//! One editor session is current at a time; a new connection replaces the
//! previous one. With no session attached, sends are dropped, the same as a
//! `postMessage` into a frame that has not loaded yet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use axum::extract::ws::Message;
use tokio::sync::{broadcast, mpsc, watch};

use envbus_core::error::Result;
use envbus_core::protocol::RawEnvelope;

use crate::channel::{origin_matches, ChannelAdapter, Inbox};
use crate::transport::codec;

const INBOX_CAPACITY: usize = 256;
const OUTBOX_CAPACITY: usize = 1024;

struct Session {
    id: u64,
    origin: Option<String>,
    out: mpsc::Sender<Message>,
}

pub struct WsHostChannel {
    inbound: broadcast::Sender<RawEnvelope>,
    current: Mutex<Option<Session>>,
    next_id: AtomicU64,
    connected: watch::Sender<u64>,
}

impl Default for WsHostChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WsHostChannel {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(INBOX_CAPACITY);
        let (connected, _) = watch::channel(0);
        Self {
            inbound,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            connected,
        }
    }

    /// Make a new editor session current. Returns its id and the queue of
    /// frames to write to it.
    pub fn attach(&self, origin: Option<String>) -> (u64, mpsc::Receiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (out, out_rx) = mpsc::channel(OUTBOX_CAPACITY);

        let replaced = {
            let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
            guard.replace(Session {
                id,
                origin: origin.clone(),
                out,
            })
        };
        if let Some(old) = replaced {
            tracing::info!(old = old.id, new = id, "editor session replaced");
        }

        self.connected.send_replace(id);
        tracing::info!(session = id, origin = ?origin, "editor attached");
        (id, out_rx)
    }

    /// Detach a session if it is still current.
    pub fn detach(&self, id: u64) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().is_some_and(|s| s.id == id) {
            *guard = None;
            tracing::info!(session = id, "editor detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    /// Latest session id; changes on every new connection.
    pub fn connections(&self) -> watch::Receiver<u64> {
        self.connected.subscribe()
    }

    /// Fan an inbound envelope out to subscribers.
    pub fn deliver(&self, env: RawEnvelope) {
        if self.inbound.send(env).is_err() {
            tracing::debug!("inbound envelope with no subscriber; dropped");
        }
    }
}

impl ChannelAdapter for WsHostChannel {
    fn send(&self, env: RawEnvelope, target_origin: Option<&str>) -> Result<()> {
        let frame = codec::encode(&env)?;

        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let Some(session) = guard.as_ref() else {
            tracing::debug!(msg_type = %env.msg_type, "no editor attached; dropped");
            return Ok(());
        };

        if !origin_matches(target_origin, session.origin.as_deref()) {
            tracing::debug!(
                target_origin = ?target_origin,
                session_origin = ?session.origin,
                msg_type = %env.msg_type,
                "target origin does not match editor; dropped"
            );
            return Ok(());
        }

        if let Err(e) = session.out.try_send(frame) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(session = session.id, msg_type = %env.msg_type, "editor outbox full; dropped")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::debug!(session = session.id, msg_type = %env.msg_type, "editor session closing; dropped")
                }
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> Inbox {
        self.inbound.subscribe()
    }
}
