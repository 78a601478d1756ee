//! WebSocket handler for the editor session.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS, refusing editors from an unexpected `Origin`
//! - Attach the session to the host channel
//! - Decode text frames into envelopes and hand them to the channel
//! - Answer pings; drop oversized or malformed frames without closing

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};

use crate::app_state::AppState;
use crate::transport::codec::{decode, Inbound};

const ROLE: &str = "transport";

pub async fn ws_upgrade(
    State(app): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(expected) = app.cfg().host.editor_origin.as_deref() {
        if origin.as_deref() != Some(expected) {
            tracing::warn!(origin = ?origin, expected, "editor connection from unexpected origin refused");
            app.metrics().origin_violations.inc(&[]);
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    ws.on_upgrade(move |socket| run_session(app, origin, socket))
}

async fn run_session(app: AppState, origin: Option<String>, socket: WebSocket) {
    let channel = app.channel();
    let max_frame_bytes = app.cfg().host.max_frame_bytes;

    let (session, mut out_rx) = channel.attach(origin);
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if ws_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let Ok(msg) = incoming else { break; };

                match decode(msg, max_frame_bytes) {
                    Ok(Inbound::Envelope { env, .. }) => channel.deliver(env),
                    Ok(Inbound::Oversized { bytes_len }) => {
                        app.metrics().decode_errors.inc(&[("role", ROLE)]);
                        tracing::warn!(session, bytes_len, max_frame_bytes, "oversized frame dropped");
                    }
                    Ok(Inbound::Ping(payload)) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        app.metrics().decode_errors.inc(&[("role", ROLE)]);
                        tracing::warn!(session, code = e.code().as_str(), error = %e, "undecodable frame dropped");
                    }
                }
            }
        }
    }

    channel.detach(session);
}
