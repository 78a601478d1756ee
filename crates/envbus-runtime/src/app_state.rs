//! Shared application state for the envbus host.

use std::sync::Arc;

use envbus_core::error::Result;

use crate::config::BusConfig;
use crate::obs::BusMetrics;
use crate::transport::WsHostChannel;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: BusConfig,
    channel: Arc<WsHostChannel>,
    metrics: Arc<BusMetrics>,
}

impl AppState {
    /// Validates the config again so hand-built configs get the same checks as
    /// loaded ones.
    pub fn new(cfg: BusConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                channel: Arc::new(WsHostChannel::new()),
                metrics: Arc::new(BusMetrics::default()),
            }),
        })
    }

    pub fn cfg(&self) -> &BusConfig {
        &self.inner.cfg
    }

    pub fn channel(&self) -> Arc<WsHostChannel> {
        Arc::clone(&self.inner.channel)
    }

    pub fn metrics(&self) -> Arc<BusMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
