use axum::{
    extract::{Query, State},
    middleware as axum_mw,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::metrics::report::{render_report, DEFAULT_DELIMITER};
use crate::middleware::tracking;
use crate::AppState;

/// Builds the full Axum `Router`: the host's `routes`, the health and
/// metrics endpoints, request tracking, and panic catching.
pub fn create_router(state: Arc<AppState>, routes: Router<Arc<AppState>>) -> Router {
    routes
        // ── Diagnostics ─────────────────────────────────────────
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_report))
        // ── Every routed request is counted ─────────────────────
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            tracking::track_requests,
        ))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
}

// ─── GET /metrics ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Line delimiter, newline by default.
    pub delim: Option<String>,
}

/// Plain-text report, one `name,value[,dimension]` observation per line.
pub async fn metrics_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> String {
    let delim = query.delim.as_deref().unwrap_or(DEFAULT_DELIMITER);
    render_report(&state.metrics.snapshot(), state.system.usage(), delim)
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
