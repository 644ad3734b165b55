use crate::collectors::config::InfluxConfig;
use crate::collectors::series::{GraphiteSink, HttpConnector, MetricSink, run_cycle};
use anyhow::{Result, anyhow};
use std::io::Write;
use tracing::info;

/// Run a single collection cycle and publish it as Graphite plaintext on `out`.
///
/// # Errors
///
/// Returns an error if no configured host could be collected
pub async fn handle<W: Write + Send>(config: &InfluxConfig, path: &str, out: W) -> Result<W> {
    let connector = HttpConnector::new(config.timeout);
    let sink = GraphiteSink::new(path, out);

    let report = run_cycle(config, &connector, &sink as &dyn MetricSink).await;

    info!(
        hosts = report.hosts_total,
        hosts_failed = report.hosts_failed,
        metrics = report.metrics_emitted,
        "published series counts"
    );

    if report.all_hosts_failed() {
        return Err(anyhow!(
            "none of the {} configured influxdb hosts could be collected",
            report.hosts_total
        ));
    }

    Ok(sink.into_inner())
}
