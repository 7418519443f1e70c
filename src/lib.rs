//! In-process request/business metrics with a text pull endpoint and a
//! periodic OTLP/HTTP push exporter.
//!
//! ```text
//! request pipeline ──► track_requests ──► MetricsCollector ◄── business hooks
//!                                             │        │
//!                          GET /metrics ◄── report   Exporter ──► collector (POST)
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod server;

use std::sync::Arc;

use metrics::system::SystemProbe;
use metrics::MetricsCollector;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Process-wide aggregator. Middleware and business logic write to it.
    /// The pull endpoint and the exporter read from it.
    pub metrics: Arc<MetricsCollector>,

    /// Host CPU / memory probe used by the pull endpoint.
    pub system: Arc<SystemProbe>,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self {
            metrics,
            system: Arc::new(SystemProbe::new()),
        }
    }
}
