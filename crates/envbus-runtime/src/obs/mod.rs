//! Lightweight in-process metrics.
//!
//! Handlers record envelope traffic, rejected sends, and handshake outcomes
//! here; the host binary exposes the rendered text on `/metrics`.

pub mod metrics;

pub use metrics::BusMetrics;
