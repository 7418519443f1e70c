use std::collections::BTreeMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{EndpointKey, StatusClass};

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe aggregator for the whole process.
/// The request pipeline and business logic record into it,
/// the pull endpoint and the exporter read snapshots out of it.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// Handed out by `record_request_start`, consumed by `record_request_finish`.
#[derive(Debug)]
pub struct RequestContext {
    key: EndpointKey,
    started: Instant,
}

impl RequestContext {
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthCounts {
    pub success: u64,
    pub failure: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounts {
    /// Cumulative number of users created.
    pub created: u64,
    /// Last-set gauge, bumped by each creation.
    pub active: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PurchaseCounts {
    pub count: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_cost: f64,
}

/// Point-in-time copy of the aggregator state.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Cumulative request counts per endpoint.
    pub requests: BTreeMap<EndpointKey, u64>,
    /// Per-request latencies (ms) collected in the current window.
    pub durations: BTreeMap<EndpointKey, Vec<f64>>,
    /// Cumulative counts per status class and endpoint.
    pub status: BTreeMap<StatusClass, BTreeMap<EndpointKey, u64>>,
    pub auth: AuthCounts,
    pub users: UserCounts,
    pub purchases: PurchaseCounts,
}

impl MetricsSnapshot {
    /// Arithmetic mean of the window for `key`, if it has samples.
    pub fn mean_duration_ms(&self, key: &EndpointKey) -> Option<f64> {
        self.durations.get(key).and_then(|s| mean(s))
    }
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    // Cumulative
    requests: BTreeMap<EndpointKey, u64>,
    status: BTreeMap<StatusClass, BTreeMap<EndpointKey, u64>>,
    auth: AuthCounts,
    users: UserCounts,
    purchases: PurchaseCounts,

    // Windowed, drained by the exporter
    durations: BTreeMap<EndpointKey, Vec<f64>>,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Count an inbound request and start its clock.
    pub fn record_request_start(&self, key: EndpointKey) -> RequestContext {
        {
            let mut inner = self.inner.lock();
            let count = inner.requests.entry(key.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
        RequestContext {
            key,
            started: Instant::now(),
        }
    }

    /// Close out a request: append its latency to the window and bump
    /// the counter for its status class.
    pub fn record_request_finish(&self, ctx: RequestContext, status: u16) {
        let elapsed_ms = ctx.started.elapsed().as_secs_f64() * 1000.0;
        self.finish(ctx.key, elapsed_ms, status);
    }

    fn finish(&self, key: EndpointKey, elapsed_ms: f64, status: u16) {
        let class = StatusClass::from_status(status);
        let mut inner = self.inner.lock();

        inner.durations.entry(key.clone()).or_default().push(elapsed_ms);

        match class {
            Some(class) => {
                let count = inner.status.entry(class).or_default().entry(key).or_insert(0);
                *count = count.saturating_add(1);
            }
            None => {
                drop(inner);
                debug!(endpoint = %key, status, "status code outside tracked classes");
            }
        }
    }

    /// A new user counts as created and as active in the same step.
    pub fn record_user_created(&self) {
        let mut inner = self.inner.lock();
        inner.users.created = inner.users.created.saturating_add(1);
        inner.users.active = inner.users.active.saturating_add(1);
    }

    /// Overwrite the active-user gauge. Negative counts are not
    /// representable; callers holding a signed value clamp before calling.
    pub fn set_active_users(&self, count: u64) {
        self.inner.lock().users.active = count;
    }

    pub fn record_auth_attempt(&self, success: bool) {
        let mut inner = self.inner.lock();
        if success {
            inner.auth.success = inner.auth.success.saturating_add(1);
        } else {
            inner.auth.failure = inner.auth.failure.saturating_add(1);
        }
    }

    /// Count a purchase. Only successful purchases contribute to the
    /// cost total, and only with a finite, non-negative cost.
    pub fn record_purchase(&self, successful: bool, cost: f64) {
        let valid_cost = cost.is_finite() && cost >= 0.0;
        {
            let mut inner = self.inner.lock();
            inner.purchases.count = inner.purchases.count.saturating_add(1);
            if successful {
                inner.purchases.successful = inner.purchases.successful.saturating_add(1);
                if valid_cost {
                    inner.purchases.total_cost += cost;
                }
            } else {
                inner.purchases.failed = inner.purchases.failed.saturating_add(1);
            }
        }

        if successful && !valid_cost {
            warn!(cost, "ignoring invalid purchase cost");
        }
    }

    /// Read-only copy of everything. The duration window is left intact.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        MetricsSnapshot {
            requests: inner.requests.clone(),
            durations: inner.durations.clone(),
            status: inner.status.clone(),
            auth: inner.auth,
            users: inner.users,
            purchases: inner.purchases,
        }
    }

    /// Copy of the cumulative state plus the duration window, which is
    /// swapped out under the same lock so no concurrent append is lost.
    pub fn take_export_snapshot(&self) -> MetricsSnapshot {
        let mut inner = self.inner.lock();
        let durations = std::mem::take(&mut inner.durations);
        MetricsSnapshot {
            requests: inner.requests.clone(),
            durations,
            status: inner.status.clone(),
            auth: inner.auth,
            users: inner.users,
            purchases: inner.purchases,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}
