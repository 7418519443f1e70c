//! Plain-text report of the current aggregator state for the pull endpoint.
//!
//! One `name,value[,dimension]` line per observation. Rendering never
//! mutates the collector, so the duration window survives a pull.

use super::builder::MetricBuilder;
use super::collector::MetricsSnapshot;
use super::family::{self, MetricFamily};
use super::system::SystemUsage;

pub const DEFAULT_DELIMITER: &str = "\n";

/// Render `snap` with lines joined by `delim`.
pub fn render_report(snap: &MetricsSnapshot, usage: SystemUsage, delim: &str) -> String {
    let mut buf = MetricBuilder::new();

    push_all(&mut buf, family::http_families(snap));
    push_all(&mut buf, family::system_families(usage));
    push_all(&mut buf, family::user_families(snap));
    push_all(&mut buf, family::purchase_families(snap));
    push_all(&mut buf, family::auth_families(snap));

    buf.render(delim)
}

fn push_all(buf: &mut MetricBuilder, families: Vec<MetricFamily>) {
    for f in families {
        let dim = f.dimension.as_ref().map(|(_, v)| v.as_str());
        buf.add_observation(&f.name, f.value, dim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{EndpointKey, MetricsCollector};

    fn usage() -> SystemUsage {
        SystemUsage {
            cpu_percent: 25.0,
            memory_percent: 61.5,
        }
    }

    #[test]
    fn single_request_report() {
        let collector = MetricsCollector::new();
        let ctx = collector.record_request_start(EndpointKey::new("GET", "/x"));
        collector.record_request_finish(ctx, 200);

        let report = render_report(&collector.snapshot(), usage(), ";");

        assert!(report.contains("http_requests_total,1,GET /x;"));
        assert!(report.contains("status_200,1,GET /x;"));
        assert!(report.contains("system_memory_usage_percent,61.5;"));
        assert!(!report.starts_with(';'));
        assert!(!report.ends_with(';'));
        assert!(!report.contains(";;"));
    }

    #[test]
    fn categories_in_report_order() {
        let collector = MetricsCollector::new();
        collector.record_purchase(true, 12.5);
        collector.record_auth_attempt(true);

        let report = render_report(&collector.snapshot(), usage(), DEFAULT_DELIMITER);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "system_cpu_usage_percent,25");
        assert_eq!(lines[2], "users_created_total,0");
        assert_eq!(lines[4], "purchases_total,1");
        assert_eq!(lines[7], "purchases_total_cost,12.5");
        assert_eq!(lines[8], "auth_success_total,1");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn rendering_leaves_window_intact() {
        let collector = MetricsCollector::new();
        let ctx = collector.record_request_start(EndpointKey::new("POST", "/api/order"));
        collector.record_request_finish(ctx, 200);

        let first = render_report(&collector.snapshot(), usage(), "\n");
        let second = render_report(&collector.snapshot(), usage(), "\n");

        assert!(first.contains("http_request_duration_ms,"));
        assert!(second.contains("http_request_duration_ms,"));
        assert_eq!(collector.snapshot().durations.len(), 1);
    }
}
