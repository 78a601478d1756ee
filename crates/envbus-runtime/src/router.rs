//! Axum router wiring.
//!
//! `/v1/bus` upgrades the editor connection; `/metrics` renders `BusMetrics`.

use axum::{extract::State, routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/bus", get(transport::ws::ws_upgrade))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn metrics(State(app): State<AppState>) -> String {
    app.metrics().render()
}
