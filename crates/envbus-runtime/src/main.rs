//! envbus host
//!
//! Serves one document to an embedded editor over `/v1/bus`:
//! - Probes every newly connected editor with `REQUEST_INIT` until it answers
//! - Answers language and content requests from the document on disk
//! - Type `save` on stdin to pull the editor's content back to disk

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use envbus_core::error::{BusError, Result};
use envbus_runtime::host::{CatalogResolver, DocumentHost, FsDocumentStore};
use envbus_runtime::{app_state, config, router, ChannelAdapter, OuterHandler, OuterOptions};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "envbus-host failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(cfg_path), Some(doc_path)) = (args.next(), args.next()) else {
        return Err(BusError::BadRequest(
            "usage: envbus-host <config.yaml> <document-path>".into(),
        ));
    };

    let cfg = config::load_from_file(&cfg_path)?;
    let listen: SocketAddr = cfg
        .host
        .listen
        .parse()
        .map_err(|e| BusError::BadRequest(format!("host.listen must be a valid SocketAddr: {e}")))?;

    let state = app_state::AppState::new(cfg)?;

    let document = Arc::new(DocumentHost::new(
        doc_path,
        state.cfg().host.origin.clone(),
        Arc::new(CatalogResolver::from_config(&state.cfg().languages)),
        Arc::new(FsDocumentStore),
    ));
    let channel: Arc<dyn ChannelAdapter> = state.channel();
    let bus = OuterHandler::with_options(
        channel,
        document.clone(),
        OuterOptions::from_config(state.cfg()),
        state.metrics(),
    );
    bus.start_listening()?;

    tokio::spawn(restart_polling_on_connect(state.clone(), bus.clone()));
    tokio::spawn(log_handshake(bus.clone()));
    tokio::spawn(read_commands(bus.clone(), document));

    let app = router::build_router(state);

    tracing::info!(%listen, "envbus-host starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| BusError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .map_err(|e| BusError::Internal(format!("server failed: {e}")))?;

    bus.stop_init_polling();
    bus.stop_listening();
    Ok(())
}

/// Every new editor connection is a fresh envelope that needs its own
/// handshake.
async fn restart_polling_on_connect(state: app_state::AppState, bus: OuterHandler) {
    let mut connections = state.channel().connections();
    while connections.changed().await.is_ok() {
        let session = *connections.borrow_and_update();
        bus.stop_init_polling();
        if let Err(e) = bus.start_init_polling() {
            tracing::warn!(session, error = %e, "init polling failed to start");
        }
    }
}

async fn log_handshake(bus: OuterHandler) {
    let mut handshake = bus.handshake();
    while handshake.changed().await.is_ok() {
        let state = *handshake.borrow_and_update();
        tracing::info!(?state, "handshake state changed");
    }
}

async fn read_commands(bus: OuterHandler, document: Arc<DocumentHost>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "save" => match document.request_save(&bus) {
                Ok(true) => tracing::info!("save requested"),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "save request failed"),
            },
            "" => {}
            other => tracing::info!(command = other, "unknown command; try `save`"),
        }
    }
}
