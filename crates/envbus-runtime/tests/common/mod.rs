#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use envbus_core::error::Result;
use envbus_core::protocol::RawEnvelope;
use envbus_runtime::{ChannelAdapter, Inbox};

/// Channel that records every send and lets the test push inbound envelopes.
pub struct RecordingChannel {
    sent: Mutex<Vec<(RawEnvelope, Option<String>)>>,
    inbound: broadcast::Sender<RawEnvelope>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(64);
        Self {
            sent: Mutex::new(Vec::new()),
            inbound,
        }
    }

    pub fn inject(&self, json: &str) {
        let _ = self.inbound.send(env(json));
    }

    pub fn sent(&self) -> Vec<(RawEnvelope, Option<String>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent().into_iter().map(|(e, _)| e.msg_type).collect()
    }

    pub fn count(&self, msg_type: &str) -> usize {
        self.sent_types().iter().filter(|t| *t == msg_type).count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl ChannelAdapter for RecordingChannel {
    fn send(&self, env: RawEnvelope, target_origin: Option<&str>) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((env, target_origin.map(str::to_string)));
        Ok(())
    }

    fn subscribe(&self) -> Inbox {
        self.inbound.subscribe()
    }
}

pub fn env(json: &str) -> RawEnvelope {
    RawEnvelope::from_json(json).unwrap()
}

pub fn data_json(env: &RawEnvelope) -> serde_json::Value {
    serde_json::from_str(env.data.as_ref().expect("data present").get()).unwrap()
}

/// Wait for the next delegate event, failing the test after `secs`.
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>, secs: u64) -> T {
    tokio::time::timeout(Duration::from_secs(secs), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}
