//! Periodic push of every metric family to an OTLP/HTTP collector.
//!
//! Each tick drains the duration window, builds the family list, encodes
//! one payload per family and pushes them concurrently. The tick waits for
//! every push and logs the aggregate outcome; nothing is propagated.
//! Ticks never overlap: one still running when the next is due causes
//! that next tick to be skipped.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::collector::MetricsCollector;
use super::family;
use super::system::SystemProbe;
use super::wire::{self, KeyValue, MonotonicClock};
use crate::config::MetricsConfig;
use crate::error::ExportError;

// ─── Public types ────────────────────────────────────────────────

/// Cheaply cloneable; every clone shares the collector, client and clock.
#[derive(Clone)]
pub struct Exporter {
    collector: Arc<MetricsCollector>,
    probe: Arc<SystemProbe>,
    pusher: Arc<Pusher>,
    clock: Arc<MonotonicClock>,
    resource: Arc<[KeyValue]>,
}

/// Outcome of one export tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sent: usize,
    pub failed: usize,
}

/// Keeps the periodic task alive. Dropping it stops the timer as well.
pub struct ExporterHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExporterHandle {
    /// Stop the timer. An in-flight tick is abandoned.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

// ─── Exporter impl ───────────────────────────────────────────────

impl Exporter {
    pub fn new(collector: Arc<MetricsCollector>, config: &MetricsConfig) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

        let resource: Vec<KeyValue> = config
            .source
            .iter()
            .map(|s| KeyValue::string("service.name", s.clone()))
            .collect();

        Ok(Self {
            collector,
            probe: Arc::new(SystemProbe::new()),
            pusher: Arc::new(Pusher {
                client,
                url: config.url.clone(),
                api_key: config.api_key.clone(),
            }),
            clock: Arc::new(MonotonicClock::new()),
            resource: resource.into(),
        })
    }

    /// Run one export pass.
    pub async fn tick(&self) -> TickReport {
        let snap = self.collector.take_export_snapshot();
        let usage = self.probe.usage();
        let families = family::all_families(&snap, usage);

        let mut report = TickReport::default();
        let mut pushes = JoinSet::new();

        for family in families {
            let payload = wire::encode(&family, self.clock.now_nanos(), &self.resource);
            let body = match payload.to_json() {
                Ok(body) => body,
                Err(e) => {
                    error!(metric = %family.name, error = %e, "skipping unencodable metric");
                    report.failed += 1;
                    continue;
                }
            };

            let pusher = self.pusher.clone();
            pushes.spawn(async move {
                let result = pusher.push(&family.name, body).await;
                (family.name, result)
            });
        }

        while let Some(joined) = pushes.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(metric = %name, "pushed {name}");
                    report.sent += 1;
                }
                Ok((_, Err(_))) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "metric push task failed");
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            warn!(sent = report.sent, failed = report.failed, "metrics tick finished with failures");
        } else {
            debug!(sent = report.sent, "metrics tick finished");
        }
        report
    }

    /// Tick every `period` until the returned handle is shut down or dropped.
    /// The first tick fires one full period after the call.
    pub fn start_periodic_reporting(self, period: Duration) -> ExporterHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(period, rx));
        ExporterHandle { shutdown: tx, task }
    }

    async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = period.as_millis() as u64, "metrics exporter started");

        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Tick body runs as its own task so a panic is contained.
                    let exporter = self.clone();
                    let mut tick = tokio::spawn(async move { exporter.tick().await });

                    tokio::select! {
                        joined = &mut tick => {
                            if let Err(e) = joined {
                                error!(error = %e, "metrics tick aborted");
                            }
                        }
                        _ = shutdown.changed() => {
                            tick.abort();
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("metrics exporter stopped");
    }
}

// ─── HTTP push ───────────────────────────────────────────────────

struct Pusher {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl Pusher {
    async fn push(&self, metric: &str, body: String) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body.clone())
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!(metric, error = %e, payload = %body, "error pushing metrics");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                metric,
                status = status.as_u16(),
                body = %text,
                payload = %body,
                "failed to push metrics data"
            );
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(())
    }
}
