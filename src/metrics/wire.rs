//! OTLP/JSON encoding of a single metric family.
//!
//! ```text
//! resourceMetrics[0]
//!   └── scopeMetrics[0]
//!         └── metrics[0] { name, unit, sum | gauge }
//!               └── dataPoints[0] { asInt | asDouble, timeUnixNano, attributes }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::family::{MetricFamily, MetricKind, MetricValue};
use crate::error::ExportError;

const CUMULATIVE: &str = "AGGREGATION_TEMPORALITY_CUMULATIVE";

// ─── Payload types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeMetrics {
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub data: MetricData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricData {
    Sum(Sum),
    Gauge(Gauge),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    pub data_points: Vec<DataPoint>,
    pub aggregation_temporality: &'static str,
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(flatten)]
    pub value: PointValue,
    pub time_unix_nano: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum PointValue {
    #[serde(rename = "asInt")]
    Int(i64),
    #[serde(rename = "asDouble")]
    Double(f64),
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AnyValue {
                string_value: value.into(),
            },
        }
    }
}

// ─── Encoder ─────────────────────────────────────────────────────

/// Builds the nested payload for one family at `time_unix_nano`.
/// `resource_attrs` is attached to the resource when non-empty.
pub fn encode(family: &MetricFamily, time_unix_nano: u64, resource_attrs: &[KeyValue]) -> ExportRequest {
    let value = match family.value {
        MetricValue::Int(v) => PointValue::Int(v),
        MetricValue::Double(v) => PointValue::Double(v),
    };

    let attributes = family
        .dimension
        .iter()
        .map(|(k, v)| KeyValue::string(*k, v.clone()))
        .collect();

    let data_points = vec![DataPoint {
        value,
        time_unix_nano,
        attributes,
    }];

    let data = match family.kind {
        MetricKind::Sum => MetricData::Sum(Sum {
            data_points,
            aggregation_temporality: CUMULATIVE,
            is_monotonic: true,
        }),
        MetricKind::Gauge => MetricData::Gauge(Gauge { data_points }),
    };

    let resource = (!resource_attrs.is_empty()).then(|| Resource {
        attributes: resource_attrs.to_vec(),
    });

    ExportRequest {
        resource_metrics: vec![ResourceMetrics {
            resource,
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![Metric {
                    name: family.name.clone(),
                    unit: family.unit.to_string(),
                    data,
                }],
            }],
        }],
    }
}

impl ExportRequest {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ─── Timestamps ──────────────────────────────────────────────────

/// Wall clock in nanoseconds that never runs backwards between calls.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_nanos(&self) -> u64 {
        let wall = chrono::Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        self.observe(wall)
    }

    /// Returns `max(wall, previous)` and remembers it.
    fn observe(&self, wall: u64) -> u64 {
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value(req: &ExportRequest) -> Value {
        serde_json::from_str(&req.to_json().unwrap()).unwrap()
    }

    #[test]
    fn sum_declares_cumulative_monotonic() {
        let family = MetricFamily::sum("purchases_total", "count", MetricValue::Int(7));
        let v = to_value(&encode(&family, 1_000, &[]));

        assert_eq!(
            v,
            json!({
                "resourceMetrics": [{
                    "scopeMetrics": [{
                        "metrics": [{
                            "name": "purchases_total",
                            "unit": "count",
                            "sum": {
                                "dataPoints": [{ "asInt": 7, "timeUnixNano": 1000 }],
                                "aggregationTemporality": "AGGREGATION_TEMPORALITY_CUMULATIVE",
                                "isMonotonic": true
                            }
                        }]
                    }]
                }]
            })
        );
    }

    #[test]
    fn gauge_has_no_temporality() {
        let family = MetricFamily::gauge("users_active", "count", MetricValue::Double(1.5));
        let v = to_value(&encode(&family, 42, &[]));

        let gauge = &v["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["gauge"];
        assert_eq!(gauge["dataPoints"][0]["asDouble"], json!(1.5));
        assert_eq!(gauge["dataPoints"][0]["timeUnixNano"], json!(42));
        assert!(gauge.get("aggregationTemporality").is_none());
        assert!(gauge.get("isMonotonic").is_none());
    }

    #[test]
    fn dimension_becomes_point_attribute() {
        let family = MetricFamily::sum("http_requests_total", "count", MetricValue::Int(3))
            .with_endpoint("GET /x");
        let v = to_value(&encode(&family, 1, &[]));

        let metric = &v["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0];
        assert_eq!(metric["name"], json!("http_requests_total"));
        assert_eq!(
            metric["sum"]["dataPoints"][0]["attributes"],
            json!([{ "key": "endpoint", "value": { "stringValue": "GET /x" } }])
        );
    }

    #[test]
    fn resource_attributes_when_configured() {
        let family = MetricFamily::gauge("users_active", "count", MetricValue::Int(0));
        let attrs = [KeyValue::string("service.name", "jwt-pizza-service")];
        let v = to_value(&encode(&family, 1, &attrs));

        assert_eq!(
            v["resourceMetrics"][0]["resource"]["attributes"][0]["value"]["stringValue"],
            json!("jwt-pizza-service")
        );
    }

    #[test]
    fn clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.observe(100), 100);
        assert_eq!(clock.observe(50), 100);
        assert_eq!(clock.observe(150), 150);
        assert!(clock.now_nanos() >= 150);
    }
}
