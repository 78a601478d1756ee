//! Editor-side (inner) handler.
//!
//! The inner handler learns who the host is from the first `REQUEST_INIT` and
//! addresses everything it sends to that origin afterwards. Until then it
//! refuses to send at all: there is nobody trustworthy to send to.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;

use envbus_core::error::{BusError, Result};
use envbus_core::protocol::{LanguageData, Message, RawEnvelope};

use crate::channel::ChannelAdapter;
use crate::handler::{decode_inbound, delegate_failed, Role};
use crate::listener::{Dispatch, Listener};
use crate::obs::BusMetrics;

/// Editor capabilities the inner handler calls into.
#[async_trait]
pub trait InnerDelegate: Send + Sync + 'static {
    /// Host answered `REQUEST_LANGUAGE`. `None`: no editor for this document.
    async fn receive_language_response(
        &self,
        bus: &InnerHandler,
        language: Option<LanguageData>,
    ) -> Result<()>;

    /// Host pushed a document to load.
    async fn receive_set_content_response(&self, bus: &InnerHandler, content: String) -> Result<()>;

    /// Host wants the current document; answer with
    /// `respond_get_content_request`.
    async fn receive_get_content_request(&self, bus: &InnerHandler) -> Result<()>;
}

struct InnerShared {
    channel: Arc<dyn ChannelAdapter>,
    delegate: Arc<dyn InnerDelegate>,
    metrics: Arc<BusMetrics>,
    target_origin: OnceLock<String>,
    listener: Listener,
}

/// Cheap to clone; clones share one state machine.
#[derive(Clone)]
pub struct InnerHandler {
    shared: Arc<InnerShared>,
}

impl InnerHandler {
    pub fn new(channel: Arc<dyn ChannelAdapter>, delegate: Arc<dyn InnerDelegate>) -> Self {
        Self::with_metrics(channel, delegate, Arc::new(BusMetrics::default()))
    }

    pub fn with_metrics(
        channel: Arc<dyn ChannelAdapter>,
        delegate: Arc<dyn InnerDelegate>,
        metrics: Arc<BusMetrics>,
    ) -> Self {
        let listener = Listener::new(Role::Inner, Arc::clone(&metrics));
        Self {
            shared: Arc::new(InnerShared {
                channel,
                delegate,
                metrics,
                target_origin: OnceLock::new(),
                listener,
            }),
        }
    }

    pub fn metrics(&self) -> &Arc<BusMetrics> {
        &self.shared.metrics
    }

    /// The host origin, once captured.
    pub fn target_origin(&self) -> Option<&str> {
        self.shared.target_origin.get().map(String::as_str)
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.target_origin.get().is_some()
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
            tracing::debug!(role = "inner", "listening");
        }
        Ok(())
    }

    pub fn stop_listening(&self) {
        if self.shared.listener.stop() {
            tracing::debug!(role = "inner", "stopped listening");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.shared.listener.is_listening()
    }

    // --------------------
    // Inbound
    // --------------------

    /// Dispatch one inbound envelope.
    pub async fn receive(&self, raw: RawEnvelope) {
        let metrics = &self.shared.metrics;
        let Some(msg) = decode_inbound(Role::Inner, metrics, &raw) else {
            return;
        };

        let started = Instant::now();
        let ty = msg.msg_type();
        let delegate = &self.shared.delegate;

        let res = match msg {
            Message::RequestInit { origin } => self.init_requested(origin),
            Message::ReturnLanguage(language) => {
                delegate.receive_language_response(self, language).await
            }
            Message::ReturnSetContent(content) => {
                delegate.receive_set_content_response(self, content).await
            }
            Message::RequestGetContent => delegate.receive_get_content_request(self).await,
            other => {
                metrics.unknown_types.inc(&[("role", Role::Inner.as_str())]);
                tracing::info!(msg_type = %other.msg_type(), "message not meant for the editor side; ignored");
                Ok(())
            }
        };

        if let Err(e) = res {
            delegate_failed(Role::Inner, metrics, ty.as_str(), &e);
        }
        metrics
            .dispatch_duration
            .observe(&[("role", Role::Inner.as_str()), ("type", ty.as_str())], started.elapsed());
    }

    /// First request wins the origin; it is answered with `RETURN_INIT`
    /// followed by `REQUEST_LANGUAGE`. A repeat from the same origin (a probe
    /// that crossed our reply) only gets `RETURN_INIT` again. Another origin
    /// is refused.
    fn init_requested(&self, origin: String) -> Result<()> {
        let mut first = false;
        let captured = self.shared.target_origin.get_or_init(|| {
            first = true;
            origin.clone()
        });

        if *captured != origin {
            self.shared.metrics.origin_violations.inc(&[]);
            let err = BusError::OriginMismatch {
                captured: captured.clone(),
                offered: origin,
            };
            tracing::warn!(code = err.code().as_str(), error = %err, "REQUEST_INIT from another origin; ignored");
            return Ok(());
        }

        self.respond_init_request()?;
        if first {
            tracing::info!(target_origin = %origin, "target origin captured");
            self.request_language_response()?;
        } else {
            tracing::debug!(target_origin = %origin, "duplicate REQUEST_INIT; re-acknowledged");
        }
        Ok(())
    }

    // --------------------
    // Outbound
    // --------------------

    /// Send to the captured origin. Fails with `Uninitialized` before the first
    /// `REQUEST_INIT`: that is a delegate bug, not a lossy channel.
    pub fn send(&self, msg: Message) -> Result<()> {
        let ty = msg.msg_type();
        let Some(target) = self.shared.target_origin.get() else {
            self.shared
                .metrics
                .rejected_sends
                .inc(&[("role", Role::Inner.as_str()), ("code", "UNINITIALIZED")]);
            return Err(BusError::Uninitialized(ty.as_str()));
        };

        let raw = msg.to_raw()?;
        if let Err(e) = self.shared.channel.send(raw, Some(target)) {
            self.shared
                .metrics
                .rejected_sends
                .inc(&[("role", Role::Inner.as_str()), ("code", e.code().as_str())]);
            return Err(e);
        }

        self.shared
            .metrics
            .envelopes_sent
            .inc(&[("role", Role::Inner.as_str()), ("type", ty.as_str())]);
        tracing::debug!(role = "inner", msg_type = %ty, target_origin = %target, "sent");
        Ok(())
    }

    pub fn respond_init_request(&self) -> Result<()> {
        self.send(Message::ReturnInit)
    }

    pub fn request_language_response(&self) -> Result<()> {
        self.send(Message::RequestLanguage)
    }

    pub fn request_set_content_response(&self) -> Result<()> {
        self.send(Message::RequestSetContent)
    }

    pub fn respond_get_content_request(&self, content: impl Into<String>) -> Result<()> {
        self.send(Message::ReturnGetContent(content.into()))
    }
}

#[async_trait]
impl Dispatch for InnerShared {
    async fn dispatch(self: Arc<Self>, raw: RawEnvelope) {
        InnerHandler { shared: self }.receive(raw).await
    }
}
