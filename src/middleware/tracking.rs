use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::metrics::{EndpointKey, MetricsCollector, RequestContext};
use crate::AppState;

/// Status recorded when the handler never produced a response
/// (it panicked, or the connection went away mid-request).
const ABANDONED_STATUS: u16 = 500;

/// Counts every routed request and records its latency and status class.
///
/// Install with `route_layer` so the matched path template is available.
/// The key is `"<METHOD> <template>"`, e.g. `GET /api/order/:id`.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };

    let key = EndpointKey::new(method.as_str(), path);
    let endpoint = key.to_string();

    let start = Instant::now();
    let mut in_flight = InFlight::start(state.metrics.clone(), key);

    let response = next.run(req).await;
    let status = response.status().as_u16();
    in_flight.finish(status);

    debug!(
        status,
        %endpoint,
        us = start.elapsed().as_micros() as u64,
        "request finished"
    );

    response
}

// ─── Finish guard ────────────────────────────────────────────────

/// Records the finish exactly once: explicitly via `finish`, or on drop
/// with `ABANDONED_STATUS` if the request future unwound or was cancelled.
struct InFlight {
    collector: Arc<MetricsCollector>,
    ctx: Option<RequestContext>,
}

impl InFlight {
    fn start(collector: Arc<MetricsCollector>, key: EndpointKey) -> Self {
        let ctx = collector.record_request_start(key);
        Self {
            collector,
            ctx: Some(ctx),
        }
    }

    fn finish(&mut self, status: u16) {
        if let Some(ctx) = self.ctx.take() {
            self.collector.record_request_finish(ctx, status);
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.finish(ABANDONED_STATUS);
    }
}
