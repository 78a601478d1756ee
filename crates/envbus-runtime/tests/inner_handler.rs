#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use envbus_core::error::Result;
use envbus_core::protocol::{LanguageData, Message};
use envbus_runtime::obs::BusMetrics;
use envbus_runtime::{InnerDelegate, InnerHandler};

use common::{data_json, next, RecordingChannel};

#[derive(Debug, PartialEq)]
enum Event {
    Language(Option<LanguageData>),
    SetContent(String),
    GetContent,
}

struct Editor {
    events: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl InnerDelegate for Editor {
    async fn receive_language_response(
        &self,
        _bus: &InnerHandler,
        language: Option<LanguageData>,
    ) -> Result<()> {
        let _ = self.events.send(Event::Language(language));
        Ok(())
    }

    async fn receive_set_content_response(&self, _bus: &InnerHandler, content: String) -> Result<()> {
        let _ = self.events.send(Event::SetContent(content));
        Ok(())
    }

    async fn receive_get_content_request(&self, _bus: &InnerHandler) -> Result<()> {
        let _ = self.events.send(Event::GetContent);
        Ok(())
    }
}

fn setup() -> (Arc<RecordingChannel>, InnerHandler, mpsc::UnboundedReceiver<Event>) {
    let channel = Arc::new(RecordingChannel::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = InnerHandler::new(channel.clone(), Arc::new(Editor { events: tx }));
    (channel, handler, rx)
}

const INIT: &str = r#"{"type":"REQUEST_INIT","data":"tgt-orgn"}"#;

#[tokio::test]
async fn start_and_stop_listening_are_idempotent() {
    let (channel, handler, mut rx) = setup();

    handler.start_listening().unwrap();
    handler.start_listening().unwrap();
    assert!(handler.is_listening());
    assert_eq!(
        handler.metrics().listeners_active.get(&[("role", "inner")]),
        1
    );

    channel.inject(r#"{"type":"RETURN_SET_CONTENT","data":"foo"}"#);
    assert_eq!(next(&mut rx, 5).await, Event::SetContent("foo".into()));
    // One subscription, one dispatch.
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv())
        .await
        .is_err());

    handler.stop_listening();
    handler.stop_listening();
    assert!(!handler.is_listening());
    assert_eq!(
        handler.metrics().listeners_active.get(&[("role", "inner")]),
        0
    );

    channel.inject(r#"{"type":"RETURN_SET_CONTENT","data":"bar"}"#);
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn init_request_captures_origin_and_asks_for_language() {
    let (channel, handler, _rx) = setup();
    assert!(!handler.is_initialized());

    handler.receive(common::env(INIT)).await;

    assert_eq!(handler.target_origin(), Some("tgt-orgn"));
    let sent = channel.sent();
    let types: Vec<_> = sent.iter().map(|(e, _)| e.msg_type.as_str()).collect();
    assert_eq!(types, ["RETURN_INIT", "REQUEST_LANGUAGE"]);
    for (env, target) in &sent {
        assert_eq!(target.as_deref(), Some("tgt-orgn"));
        assert!(env.data.is_none());
    }
}

#[tokio::test]
async fn duplicate_init_only_reacknowledges() {
    let (channel, handler, _rx) = setup();

    handler.receive(common::env(INIT)).await;
    handler.receive(common::env(INIT)).await;

    assert_eq!(
        channel.sent_types(),
        ["RETURN_INIT", "REQUEST_LANGUAGE", "RETURN_INIT"]
    );
}

#[tokio::test]
async fn init_from_another_origin_is_ignored() {
    let (channel, handler, _rx) = setup();

    handler.receive(common::env(INIT)).await;
    channel.clear();
    handler
        .receive(common::env(r#"{"type":"REQUEST_INIT","data":"intruder"}"#))
        .await;

    assert!(channel.sent().is_empty());
    assert_eq!(handler.target_origin(), Some("tgt-orgn"));
    assert_eq!(handler.metrics().origin_violations.total(), 1);
}

#[tokio::test]
async fn language_response_reaches_delegate() {
    let (_channel, handler, mut rx) = setup();

    handler
        .receive(common::env(
            r#"{"type":"RETURN_LANGUAGE","data":{"editorId":"","gwtModuleName":"","erraiDomain":"","resources":[]}}"#,
        ))
        .await;

    assert_eq!(
        next(&mut rx, 5).await,
        Event::Language(Some(LanguageData {
            editor_id: String::new(),
            gwt_module_name: String::new(),
            errai_domain: String::new(),
            resources: vec![],
        }))
    );

    handler
        .receive(common::env(r#"{"type":"RETURN_LANGUAGE"}"#))
        .await;
    assert_eq!(next(&mut rx, 5).await, Event::Language(None));
}

#[tokio::test]
async fn set_content_and_get_content_reach_delegate() {
    let (_channel, handler, mut rx) = setup();

    handler
        .receive(common::env(r#"{"type":"RETURN_SET_CONTENT","data":"foo"}"#))
        .await;
    assert_eq!(next(&mut rx, 5).await, Event::SetContent("foo".into()));

    handler
        .receive(common::env(r#"{"type":"REQUEST_GET_CONTENT"}"#))
        .await;
    assert_eq!(next(&mut rx, 5).await, Event::GetContent);
}

#[tokio::test]
async fn host_only_and_unknown_types_are_ignored() {
    let (channel, handler, mut rx) = setup();

    handler.receive(common::env(r#"{"type":"RETURN_CONTENT","data":"x"}"#)).await;
    handler.receive(common::env(r#"{"type":"REQUEST_LANGUAGE"}"#)).await;
    handler.receive(common::env(r#"{"type":"SOMETHING_NEW","data":1}"#)).await;
    handler.receive(common::env(r#"{"type":"RETURN_SET_CONTENT","data":5}"#)).await;

    assert!(channel.sent().is_empty());
    assert!(rx.try_recv().is_err());
    assert_eq!(handler.metrics().unknown_types.get(&[("role", "inner")]), 3);
    assert_eq!(handler.metrics().decode_errors.get(&[("role", "inner")]), 1);
}

#[tokio::test]
async fn sends_before_init_fail() {
    let (channel, handler, _rx) = setup();

    let err = handler.request_set_content_response().expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNINITIALIZED");
    let err = handler.respond_get_content_request("x").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNINITIALIZED");
    let err = handler.respond_init_request().expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNINITIALIZED");

    assert!(channel.sent().is_empty());
    assert_eq!(
        handler
            .metrics()
            .rejected_sends
            .get(&[("role", "inner"), ("code", "UNINITIALIZED")]),
        3
    );
}

#[tokio::test]
async fn sends_after_init_target_captured_origin() {
    let (channel, handler, _rx) = setup();
    handler.receive(common::env(INIT)).await;
    channel.clear();

    handler.request_set_content_response().unwrap();
    handler.respond_get_content_request("edited").unwrap();
    handler.send(Message::RequestLanguage).unwrap();

    let sent = channel.sent();
    let types: Vec<_> = sent.iter().map(|(e, _)| e.msg_type.as_str()).collect();
    assert_eq!(types, ["REQUEST_SET_CONTENT", "RETURN_GET_CONTENT", "REQUEST_LANGUAGE"]);
    assert!(sent.iter().all(|(_, t)| t.as_deref() == Some("tgt-orgn")));
    assert_eq!(data_json(&sent[1].0), serde_json::json!("edited"));
}

/// Stops listening from inside its own callback, then still answers.
struct StopsThenReplies {
    replied: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl InnerDelegate for StopsThenReplies {
    async fn receive_language_response(
        &self,
        _bus: &InnerHandler,
        _language: Option<LanguageData>,
    ) -> Result<()> {
        Ok(())
    }

    async fn receive_set_content_response(&self, _bus: &InnerHandler, _content: String) -> Result<()> {
        Ok(())
    }

    async fn receive_get_content_request(&self, bus: &InnerHandler) -> Result<()> {
        bus.stop_listening();
        tokio::task::yield_now().await;
        bus.respond_get_content_request("current")?;
        let _ = self.replied.send(());
        Ok(())
    }
}

#[tokio::test]
async fn stopping_from_a_callback_lets_it_finish() {
    let channel = Arc::new(RecordingChannel::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = InnerHandler::new(channel.clone(), Arc::new(StopsThenReplies { replied: tx }));
    handler.start_listening().unwrap();

    channel.inject(INIT);
    channel.inject(r#"{"type":"REQUEST_GET_CONTENT"}"#);
    next(&mut rx, 5).await;

    assert!(!handler.is_listening());
    assert_eq!(
        channel.sent_types(),
        ["RETURN_INIT", "REQUEST_LANGUAGE", "RETURN_GET_CONTENT"]
    );
    assert_eq!(data_json(&channel.sent()[2].0), serde_json::json!("current"));

    // Nothing after the stop is dispatched.
    channel.inject(r#"{"type":"REQUEST_GET_CONTENT"}"#);
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv())
        .await
        .is_err());
    assert_eq!(channel.count("RETURN_GET_CONTENT"), 1);
}

#[tokio::test]
async fn dropping_a_listening_handler_releases_the_gauge() {
    let metrics = Arc::new(BusMetrics::default());
    let (tx, _rx) = mpsc::unbounded_channel();
    let handler = InnerHandler::with_metrics(
        Arc::new(RecordingChannel::new()),
        Arc::new(Editor { events: tx }),
        metrics.clone(),
    );

    handler.start_listening().unwrap();
    assert_eq!(metrics.listeners_active.get(&[("role", "inner")]), 1);

    drop(handler);
    assert_eq!(metrics.listeners_active.get(&[("role", "inner")]), 0);
}
