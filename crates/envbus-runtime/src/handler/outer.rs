//! Host-side (outer) handler.
//!
//! The outer handler starts the conversation: it probes the editor with
//! `REQUEST_INIT` until a `RETURN_INIT` comes back or the timeout budget runs
//! out, then answers the editor's language and content requests through its
//! delegate. It is never gated on initialization; it has to be able to send
//! before the editor has said anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::watch;

use envbus_core::error::{BusError, Result};
use envbus_core::protocol::{LanguageData, Message, MessageType, RawEnvelope};

use crate::channel::ChannelAdapter;
use crate::config::BusConfig;
use crate::handler::{decode_inbound, delegate_failed, Role};
use crate::listener::{Dispatch, Listener};
use crate::obs::BusMetrics;
use crate::timer::CancellableTimer;

/// Which names the host uses for the content pair on send.
///
/// Inbound, both spellings are accepted. Outbound, `Legacy` must only be used
/// against an editor known to speak `REQUEST_CONTENT`/`RETURN_CONTENT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentNames {
    #[default]
    Canonical,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Polling,
    Completed,
    /// No `RETURN_INIT` within the timeout. Not retried automatically.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct OuterOptions {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    /// Origin every host send is addressed to. `None` leaves it to the adapter.
    pub target_origin: Option<String>,
    pub content_names: ContentNames,
}

impl OuterOptions {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10_000);

    pub fn from_config(cfg: &BusConfig) -> Self {
        Self {
            poll_interval: cfg.polling.interval(),
            poll_timeout: cfg.polling.timeout(),
            target_origin: cfg.host.editor_origin.clone(),
            content_names: cfg.host.content_names,
        }
    }

    /// Same rule as the `polling` config section: a non-zero interval and a
    /// timeout strictly greater than it.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(BusError::BadRequest("poll_interval must be non-zero".into()));
        }
        if self.poll_timeout <= self.poll_interval {
            return Err(BusError::BadRequest(
                "poll_timeout must be greater than poll_interval".into(),
            ));
        }
        Ok(())
    }
}

impl Default for OuterOptions {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
            target_origin: None,
            content_names: ContentNames::Canonical,
        }
    }
}

/// Host capabilities the outer handler calls into.
#[async_trait]
pub trait OuterDelegate: Send + Sync + 'static {
    /// Called on every probe tick while polling. Expected to (re)send
    /// `REQUEST_INIT`; earlier probes may have reached an editor that was not
    /// listening yet.
    async fn poll_init(&self, bus: &OuterHandler) -> Result<()>;

    /// Editor asked for language data; answer with `respond_language_request`.
    async fn receive_language_request(&self, bus: &OuterHandler) -> Result<()>;

    /// Editor asked for the document; answer with `respond_content_request`.
    async fn receive_content_request(&self, bus: &OuterHandler) -> Result<()>;

    /// Editor returned its current document (after `request_content_response`).
    async fn receive_content_response(&self, bus: &OuterHandler, content: String) -> Result<()>;
}

struct Polling {
    round: u64,
    probe: CancellableTimer,
    timeout: CancellableTimer,
}

struct OuterShared {
    channel: Arc<dyn ChannelAdapter>,
    delegate: Arc<dyn OuterDelegate>,
    opts: OuterOptions,
    metrics: Arc<BusMetrics>,
    polling: Mutex<Option<Polling>>,
    rounds: AtomicU64,
    handshake: watch::Sender<HandshakeState>,
    listener: Listener,
}

/// Cheap to clone; clones share one state machine.
#[derive(Clone)]
pub struct OuterHandler {
    shared: Arc<OuterShared>,
}

impl OuterHandler {
    pub fn new(channel: Arc<dyn ChannelAdapter>, delegate: Arc<dyn OuterDelegate>) -> Self {
        Self::with_options(channel, delegate, OuterOptions::default(), Arc::new(BusMetrics::default()))
    }

    pub fn with_options(
        channel: Arc<dyn ChannelAdapter>,
        delegate: Arc<dyn OuterDelegate>,
        opts: OuterOptions,
        metrics: Arc<BusMetrics>,
    ) -> Self {
        let (handshake, _) = watch::channel(HandshakeState::Idle);
        let listener = Listener::new(Role::Outer, Arc::clone(&metrics));
        Self {
            shared: Arc::new(OuterShared {
                channel,
                delegate,
                opts,
                metrics,
                polling: Mutex::new(None),
                rounds: AtomicU64::new(0),
                handshake,
                listener,
            }),
        }
    }

    pub fn options(&self) -> &OuterOptions {
        &self.shared.opts
    }

    pub fn metrics(&self) -> &Arc<BusMetrics> {
        &self.shared.metrics
    }

    // --------------------
    // Listening
    // --------------------

    pub fn start_listening(&self) -> Result<()> {
        let started = self
            .shared
            .listener
            .start(self.shared.channel.as_ref(), Arc::downgrade(&self.shared))?;
        if started {
            tracing::debug!(role = "outer", "listening");
        }
        Ok(())
    }

    pub fn stop_listening(&self) {
        if self.shared.listener.stop() {
            tracing::debug!(role = "outer", "stopped listening");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.shared.listener.is_listening()
    }

    // --------------------
    // Init polling
    // --------------------

    /// Start probing the editor. No-op while a round is already running.
    /// Fails with `BadRequest` if the options cannot drive a polling round.
    pub fn start_init_polling(&self) -> Result<()> {
        self.shared.opts.validate()?;

        let mut guard = self.shared.polling.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            tracing::debug!("init polling already running");
            return Ok(());
        }

        let round = self.shared.rounds.fetch_add(1, Ordering::Relaxed) + 1;

        let weak = Arc::downgrade(&self.shared);
        let probe = CancellableTimer::every("init-probe", self.shared.opts.poll_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(shared) = weak.upgrade() {
                    OuterHandler { shared }.probe().await;
                }
            }
        })?;

        let weak = Arc::downgrade(&self.shared);
        let timeout = CancellableTimer::after("init-timeout", self.shared.opts.poll_timeout, move || async move {
            if let Some(shared) = weak.upgrade() {
                OuterHandler { shared }.poll_timed_out(round);
            }
        })?;

        *guard = Some(Polling { round, probe, timeout });
        drop(guard);

        self.shared.handshake.send_replace(HandshakeState::Polling);
        tracing::debug!(
            round,
            interval_ms = self.shared.opts.poll_interval.as_millis() as u64,
            timeout_ms = self.shared.opts.poll_timeout.as_millis() as u64,
            "init polling started"
        );
        Ok(())
    }

    /// Cancel both the probe and the timeout. Returns false if not polling.
    pub fn stop_init_polling(&self) -> bool {
        let polling = {
            let mut guard = self.shared.polling.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        match polling {
            Some(mut p) => {
                p.probe.cancel();
                p.timeout.cancel();
                tracing::debug!(round = p.round, "init polling stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        let guard = self.shared.polling.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    pub fn handshake_state(&self) -> HandshakeState {
        *self.shared.handshake.borrow()
    }

    /// Observe handshake transitions (e.g. to restart after `TimedOut`).
    pub fn handshake(&self) -> watch::Receiver<HandshakeState> {
        self.shared.handshake.subscribe()
    }

    async fn probe(&self) {
        self.shared.metrics.init_probes.inc(&[]);
        if let Err(e) = self.shared.delegate.poll_init(self).await {
            delegate_failed(Role::Outer, &self.shared.metrics, MessageType::RequestInit.as_str(), &e);
        }
    }

    /// Runs on the timeout task itself, so the timeout handle is released
    /// rather than aborted.
    fn poll_timed_out(&self, round: u64) {
        {
            let mut guard = self.shared.polling.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_mut() {
                Some(p) if p.round == round => {
                    p.timeout.release();
                    p.probe.cancel();
                }
                _ => return,
            }
            *guard = None;
        }

        self.shared.handshake.send_replace(HandshakeState::TimedOut);
        self.shared.metrics.handshakes.inc(&[("outcome", "timed_out")]);
        tracing::info!(
            timeout_ms = self.shared.opts.poll_timeout.as_millis() as u64,
            "init polling timed out; the editor envelope is not responding"
        );
    }

    fn complete_handshake(&self) {
        let was_polling = self.stop_init_polling();
        let prev = self.shared.handshake.send_replace(HandshakeState::Completed);
        if prev == HandshakeState::Completed {
            tracing::debug!("duplicate RETURN_INIT; already complete");
            return;
        }
        self.shared.metrics.handshakes.inc(&[("outcome", "completed")]);
        tracing::info!(was_polling, "handshake complete");
    }

    // --------------------
    // Inbound
    // --------------------

    /// Dispatch one inbound envelope.
    pub async fn receive(&self, raw: RawEnvelope) {
        let metrics = &self.shared.metrics;
        let Some(msg) = decode_inbound(Role::Outer, metrics, &raw) else {
            return;
        };

        let started = Instant::now();
        let ty = msg.msg_type();
        let delegate = &self.shared.delegate;

        let res = match msg {
            Message::ReturnInit => {
                self.complete_handshake();
                Ok(())
            }
            Message::RequestLanguage => delegate.receive_language_request(self).await,
            Message::ReturnGetContent(content) | Message::ReturnContent(content) => {
                delegate.receive_content_response(self, content).await
            }
            Message::RequestSetContent | Message::RequestContent => {
                delegate.receive_content_request(self).await
            }
            other => {
                metrics.unknown_types.inc(&[("role", Role::Outer.as_str())]);
                tracing::info!(msg_type = %other.msg_type(), "message not meant for the host side; ignored");
                Ok(())
            }
        };

        if let Err(e) = res {
            delegate_failed(Role::Outer, metrics, ty.as_str(), &e);
        }
        metrics
            .dispatch_duration
            .observe(&[("role", Role::Outer.as_str()), ("type", ty.as_str())], started.elapsed());
    }

    // --------------------
    // Outbound
    // --------------------

    pub fn send(&self, msg: Message) -> Result<()> {
        let ty = msg.msg_type();
        let raw = msg.to_raw()?;
        let target = self.shared.opts.target_origin.as_deref();

        if let Err(e) = self.shared.channel.send(raw, target) {
            self.shared
                .metrics
                .rejected_sends
                .inc(&[("role", Role::Outer.as_str()), ("code", e.code().as_str())]);
            return Err(e);
        }

        self.shared
            .metrics
            .envelopes_sent
            .inc(&[("role", Role::Outer.as_str()), ("type", ty.as_str())]);
        tracing::debug!(role = "outer", msg_type = %ty, target_origin = ?target, "sent");
        Ok(())
    }

    pub fn request_init_response(&self, origin: &str) -> Result<()> {
        self.send(Message::RequestInit {
            origin: origin.to_string(),
        })
    }

    /// `None` tells the editor there is nothing to load for this document.
    pub fn respond_language_request(&self, language: Option<LanguageData>) -> Result<()> {
        self.send(Message::ReturnLanguage(language))
    }

    pub fn respond_content_request(&self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        match self.shared.opts.content_names {
            ContentNames::Canonical => self.send(Message::ReturnSetContent(content)),
            ContentNames::Legacy => self.send(Message::ReturnContent(content)),
        }
    }

    /// Ask the editor for its current document (save flow).
    pub fn request_content_response(&self) -> Result<()> {
        match self.shared.opts.content_names {
            ContentNames::Canonical => self.send(Message::RequestGetContent),
            ContentNames::Legacy => self.send(Message::RequestContent),
        }
    }
}

#[async_trait]
impl Dispatch for OuterShared {
    async fn dispatch(self: Arc<Self>, raw: RawEnvelope) {
        OuterHandler { shared: self }.receive(raw).await
    }
}
