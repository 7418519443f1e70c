//! Export-time view of the aggregator: one `MetricFamily` per observation.

use super::collector::{mean, MetricsSnapshot};
use super::system::SystemUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Cumulative, monotonic.
    Sum,
    /// Point-in-time.
    Gauge,
}

/// Numeric payload of a data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Double(f64),
}

impl MetricValue {
    /// Integral finite values collapse to `Int`.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Self::Int(v as i64)
        } else {
            Self::Double(v)
        }
    }

    pub fn from_count(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

/// A single labelled metric observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub unit: &'static str,
    pub kind: MetricKind,
    /// (attribute key, attribute value), e.g. ("endpoint", "GET /x").
    pub dimension: Option<(&'static str, String)>,
    pub value: MetricValue,
}

impl MetricFamily {
    pub fn sum(name: impl Into<String>, unit: &'static str, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            unit,
            kind: MetricKind::Sum,
            dimension: None,
            value,
        }
    }

    pub fn gauge(name: impl Into<String>, unit: &'static str, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            unit,
            kind: MetricKind::Gauge,
            dimension: None,
            value,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.dimension = Some(("endpoint", endpoint.into()));
        self
    }
}

// ─── Per-category builders ───────────────────────────────────────

pub fn http_families(snap: &MetricsSnapshot) -> Vec<MetricFamily> {
    let mut out = Vec::new();

    for (key, count) in &snap.requests {
        out.push(
            MetricFamily::sum("http_requests_total", "count", MetricValue::from_count(*count))
                .with_endpoint(key.to_string()),
        );
    }

    for (key, samples) in &snap.durations {
        if let Some(avg) = mean(samples) {
            out.push(
                MetricFamily::gauge("http_request_duration_ms", "ms", MetricValue::Double(avg))
                    .with_endpoint(key.to_string()),
            );
        }
    }

    for (class, per_endpoint) in &snap.status {
        for (key, count) in per_endpoint {
            out.push(
                MetricFamily::sum(class.metric_name(), "count", MetricValue::from_count(*count))
                    .with_endpoint(key.to_string()),
            );
        }
    }

    out
}

pub fn system_families(usage: SystemUsage) -> Vec<MetricFamily> {
    vec![
        MetricFamily::gauge(
            "system_cpu_usage_percent",
            "percent",
            MetricValue::from_f64(usage.cpu_percent),
        ),
        MetricFamily::gauge(
            "system_memory_usage_percent",
            "percent",
            MetricValue::from_f64(usage.memory_percent),
        ),
    ]
}

pub fn user_families(snap: &MetricsSnapshot) -> Vec<MetricFamily> {
    vec![
        MetricFamily::sum(
            "users_created_total",
            "count",
            MetricValue::from_count(snap.users.created),
        ),
        MetricFamily::gauge("users_active", "count", MetricValue::from_count(snap.users.active)),
    ]
}

pub fn auth_families(snap: &MetricsSnapshot) -> Vec<MetricFamily> {
    vec![
        MetricFamily::sum(
            "auth_success_total",
            "count",
            MetricValue::from_count(snap.auth.success),
        ),
        MetricFamily::sum(
            "auth_failure_total",
            "count",
            MetricValue::from_count(snap.auth.failure),
        ),
    ]
}

pub fn purchase_families(snap: &MetricsSnapshot) -> Vec<MetricFamily> {
    let p = &snap.purchases;
    vec![
        MetricFamily::sum("purchases_total", "count", MetricValue::from_count(p.count)),
        MetricFamily::sum(
            "purchases_successful",
            "count",
            MetricValue::from_count(p.successful),
        ),
        MetricFamily::sum("purchases_failed", "count", MetricValue::from_count(p.failed)),
        MetricFamily::sum(
            "purchases_total_cost",
            "currency",
            MetricValue::from_f64(p.total_cost),
        ),
    ]
}

/// Every family for one export tick, in category order.
pub fn all_families(snap: &MetricsSnapshot, usage: SystemUsage) -> Vec<MetricFamily> {
    let mut out = http_families(snap);
    out.extend(system_families(usage));
    out.extend(user_families(snap));
    out.extend(auth_families(snap));
    out.extend(purchase_families(snap));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{EndpointKey, MetricsCollector};

    fn usage() -> SystemUsage {
        SystemUsage {
            cpu_percent: 12.5,
            memory_percent: 40.0,
        }
    }

    #[test]
    fn value_collapses_integral_doubles() {
        assert_eq!(MetricValue::from_f64(3.0), MetricValue::Int(3));
        assert_eq!(MetricValue::from_f64(12.5), MetricValue::Double(12.5));
        assert_eq!(MetricValue::from_count(u64::MAX), MetricValue::Int(i64::MAX));
    }

    #[test]
    fn empty_state_still_exports_scalar_families() {
        let snap = MetricsCollector::new().snapshot();
        let names: Vec<_> = all_families(&snap, usage()).into_iter().map(|f| f.name).collect();

        assert_eq!(
            names,
            vec![
                "system_cpu_usage_percent",
                "system_memory_usage_percent",
                "users_created_total",
                "users_active",
                "auth_success_total",
                "auth_failure_total",
                "purchases_total",
                "purchases_successful",
                "purchases_failed",
                "purchases_total_cost",
            ]
        );
    }

    #[test]
    fn http_families_carry_endpoint_dimension() {
        let collector = MetricsCollector::new();
        let ctx = collector.record_request_start(EndpointKey::new("GET", "/x"));
        collector.record_request_finish(ctx, 201);

        let families = http_families(&collector.snapshot());
        assert_eq!(families.len(), 3);

        let requests = &families[0];
        assert_eq!(requests.name, "http_requests_total");
        assert_eq!(requests.kind, MetricKind::Sum);
        assert_eq!(requests.dimension, Some(("endpoint", "GET /x".to_string())));
        assert_eq!(requests.value, MetricValue::Int(1));

        let duration = &families[1];
        assert_eq!(duration.kind, MetricKind::Gauge);
        assert_eq!(duration.unit, "ms");

        assert_eq!(families[2].name, "status_200");
    }

    #[test]
    fn active_users_is_a_gauge() {
        let snap = MetricsCollector::new().snapshot();
        let users = user_families(&snap);
        assert_eq!(users[0].kind, MetricKind::Sum);
        assert_eq!(users[1].kind, MetricKind::Gauge);
    }
}
