pub mod builder;
pub mod collector;
pub mod exporter;
pub mod family;
pub mod report;
pub mod system;
pub mod wire;

pub use builder::MetricBuilder;
pub use collector::{MetricsCollector, MetricsSnapshot, RequestContext};
pub use exporter::{Exporter, ExporterHandle};
pub use family::{MetricFamily, MetricKind};

use std::fmt;

// ─── Endpoint key ────────────────────────────────────────────────

/// The (HTTP method, path template) pair a request is dimensioned by.
/// e.g. "GET /api/order/:id"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointKey {
    pub method: String,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

// ─── Status classes ──────────────────────────────────────────────

/// Closed set of response classes the collector keeps counters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// Maps `floor(status / 100) * 100` onto a class.
    /// Informational (1xx) and out-of-range codes have no counter.
    pub fn from_status(status: u16) -> Option<Self> {
        match status / 100 * 100 {
            200 => Some(Self::Success),
            300 => Some(Self::Redirect),
            400 => Some(Self::ClientError),
            500 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Exported metric name, e.g. `status_400`.
    pub fn metric_name(self) -> &'static str {
        match self {
            Self::Success => "status_200",
            Self::Redirect => "status_300",
            Self::ClientError => "status_400",
            Self::ServerError => "status_500",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_class_floors_to_hundreds() {
        assert_eq!(StatusClass::from_status(200), Some(StatusClass::Success));
        assert_eq!(StatusClass::from_status(204), Some(StatusClass::Success));
        assert_eq!(StatusClass::from_status(302), Some(StatusClass::Redirect));
        assert_eq!(StatusClass::from_status(404), Some(StatusClass::ClientError));
        assert_eq!(StatusClass::from_status(599), Some(StatusClass::ServerError));
    }

    #[test]
    fn status_class_ignores_informational_and_unknown() {
        assert_eq!(StatusClass::from_status(101), None);
        assert_eq!(StatusClass::from_status(700), None);
    }

    #[test]
    fn endpoint_key_display() {
        let key = EndpointKey::new("GET", "/api/order");
        assert_eq!(key.to_string(), "GET /api/order");
    }
}
