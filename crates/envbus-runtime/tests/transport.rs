#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::extract::ws::Message;

use envbus_core::protocol::RawEnvelope;
use envbus_runtime::transport::codec::{decode, Inbound};
use envbus_runtime::{ChannelAdapter, WsHostChannel};

fn env(json: &str) -> RawEnvelope {
    RawEnvelope::from_json(json).unwrap()
}

#[test]
fn text_frames_decode_to_envelopes() {
    let frame = Message::Text(r#"{"type":"RETURN_INIT"}"#.into());
    match decode(frame, 1024).unwrap() {
        Inbound::Envelope { env, bytes_len } => {
            assert_eq!(env.msg_type, "RETURN_INIT");
            assert_eq!(bytes_len, 22);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn oversized_frames_are_flagged_before_parsing() {
    let frame = Message::Text("x".repeat(2048));
    assert!(matches!(
        decode(frame, 1024).unwrap(),
        Inbound::Oversized { bytes_len: 2048 }
    ));
}

#[test]
fn binary_and_garbage_frames_are_bad_requests() {
    let err = decode(Message::Binary(vec![1, 2, 3]), 1024).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
    let err = decode(Message::Text("not json".into()), 1024).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[tokio::test]
async fn host_channel_routes_to_current_session() {
    let channel = WsHostChannel::new();

    // No editor attached: dropped, not an error.
    channel.send(env(r#"{"type":"RETURN_INIT"}"#), None).unwrap();

    let mut connections = channel.connections();
    let (first, mut first_rx) = channel.attach(Some("http://editor".into()));
    assert!(connections.has_changed().unwrap());
    assert_eq!(*connections.borrow_and_update(), first);

    channel
        .send(env(r#"{"type":"REQUEST_INIT","data":"h"}"#), Some("http://editor"))
        .unwrap();
    channel
        .send(env(r#"{"type":"REQUEST_LANGUAGE"}"#), Some("http://elsewhere"))
        .unwrap();
    channel.send(env(r#"{"type":"RETURN_INIT"}"#), Some("*")).unwrap();

    match first_rx.recv().await.unwrap() {
        Message::Text(s) => assert_eq!(s, r#"{"type":"REQUEST_INIT","data":"h"}"#),
        other => panic!("unexpected {other:?}"),
    }
    match first_rx.recv().await.unwrap() {
        Message::Text(s) => assert_eq!(s, r#"{"type":"RETURN_INIT"}"#),
        other => panic!("unexpected {other:?}"),
    }
    assert!(first_rx.try_recv().is_err());

    // A new connection replaces the old one; detaching the stale id is a no-op.
    let (second, _second_rx) = channel.attach(None);
    assert_ne!(first, second);
    channel.detach(first);
    assert!(channel.is_attached());
    channel.detach(second);
    assert!(!channel.is_attached());
}

#[tokio::test]
async fn delivered_envelopes_reach_subscribers() {
    let channel = WsHostChannel::new();
    let mut inbox = channel.subscribe();
    channel.deliver(env(r#"{"type":"RETURN_GET_CONTENT","data":"x"}"#));
    assert_eq!(inbox.recv().await.unwrap().msg_type, "RETURN_GET_CONTENT");
}
