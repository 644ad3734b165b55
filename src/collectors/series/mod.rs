use crate::collectors::Collector;
use crate::collectors::config::InfluxConfig;
use anyhow::{Result, anyhow};
use futures::future::BoxFuture;
use prometheus::{IntGaugeVec, Opts, Registry};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

pub mod client;
pub mod cycle;
pub mod error;
pub mod host;
pub mod sink;
pub mod stats;

pub use client::{Connector, HttpClient, HttpConnector, InfluxClient};
pub use cycle::{CycleReport, run_cycle};
pub use error::CollectError;
pub use host::HostSpec;
pub use sink::{GaugeSink, GraphiteSink, MemorySink, MetricSink};

/// Series cardinality of every configured `InfluxDB` host and database.
#[derive(Clone)]
pub struct SeriesCollector {
    series_count: IntGaugeVec,
    up: IntGaugeVec,
    // one cycle at a time so concurrent scrapes never interleave gauge updates
    cycle: Arc<Mutex<()>>,
}

impl Default for SeriesCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let series_count = IntGaugeVec::new(
            Opts::new(
                "influxdb_series_count",
                "Distinct series per database, labelled with the published metric name",
            ),
            &["metric"],
        )
        .expect("valid influxdb_series_count metric opts");

        let up = IntGaugeVec::new(
            Opts::new(
                "influxdb_up",
                "Whether the last collection reached the host (1 = up, 0 = down)",
            ),
            &["host"],
        )
        .expect("valid influxdb_up metric opts");

        Self {
            series_count,
            up,
            cycle: Arc::new(Mutex::new(())),
        }
    }
}

impl Collector for SeriesCollector {
    fn name(&self) -> &'static str {
        "series"
    }

    #[instrument(
        skip(self, registry),
        level = "info",
        err,
        fields(collector = "series")
    )]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.series_count.clone()))?;
        registry.register(Box::new(self.up.clone()))?;
        Ok(())
    }

    #[instrument(skip(self, config), level = "info", err, fields(collector = "series", otel.kind = "internal"))]
    fn collect<'a>(&'a self, config: &'a InfluxConfig) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let _guard = self.cycle.lock().await;

            let connector = HttpConnector::new(config.timeout);
            let sink = GaugeSink::new(&self.series_count, &self.up);

            let report = run_cycle(config, &connector, &sink).await;
            let written = sink.flush();

            info!(
                hosts = report.hosts_total,
                hosts_failed = report.hosts_failed,
                databases_failed = report.databases_failed,
                series_metrics = written,
                "collected series counts"
            );

            if report.all_hosts_failed() {
                return Err(anyhow!(
                    "none of the {} configured influxdb hosts could be collected",
                    report.hosts_total
                ));
            }

            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
