//! One collection cycle over every configured host.

use super::client::{Connector, InfluxClient};
use super::error::CollectError;
use super::host::HostSpec;
use super::sink::MetricSink;
use super::stats;
use crate::collectors::config::InfluxConfig;
use tracing::{debug, error, info_span, warn};
use tracing_futures::Instrument as _;

/// Summary of a cycle, used for logging and error accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub hosts_total: usize,
    pub hosts_failed: usize,
    pub metrics_emitted: usize,
    pub databases_failed: usize,
}

impl CycleReport {
    #[must_use]
    pub const fn all_hosts_failed(&self) -> bool {
        self.hosts_total > 0 && self.hosts_failed == self.hosts_total
    }
}

/// Published name of a metric: `<alias>.<metric_key>` or the bare key.
#[must_use]
pub fn metric_name(alias: Option<&str>, metric_key: &str) -> String {
    match alias {
        Some(alias) => format!("{alias}.{metric_key}"),
        None => metric_key.to_string(),
    }
}

/// Run one cycle: every host, then every database of that host, in order.
///
/// Failures never abort the cycle. A malformed token or an unreachable host skips that
/// host; a failing database skips that database. Dropping the returned future cancels
/// the cycle at the next request boundary.
pub async fn run_cycle<C: Connector>(
    config: &InfluxConfig,
    connector: &C,
    sink: &dyn MetricSink,
) -> CycleReport {
    let mut report = CycleReport {
        hosts_total: config.hosts.len(),
        ..CycleReport::default()
    };

    for token in &config.hosts {
        let host = match HostSpec::parse(token) {
            Ok(host) => host,
            Err(e) => {
                error!(token = %token, error = %e, "skipping malformed host");
                report.hosts_failed += 1;
                continue;
            }
        };

        let label = host.label();
        let span = info_span!("influxdb.host", host = %label, endpoint = %host.endpoint());

        match collect_host(config, connector, &host, sink)
            .instrument(span)
            .await
        {
            Ok((emitted, failed)) => {
                sink.host_up(&label, true);
                report.metrics_emitted += emitted;
                report.databases_failed += failed;
            }
            Err(e) if e.is_host_scoped() => {
                warn!(host = %label, error = %e, "could not reach host");
                sink.host_up(&label, false);
                report.hosts_failed += 1;
            }
            Err(e) => {
                // answered, but refused database discovery (e.g. authentication)
                warn!(host = %label, error = %e, "could not list databases");
                sink.host_up(&label, true);
                report.hosts_failed += 1;
            }
        }
    }

    debug!(?report, "collection cycle finished");
    report
}

/// Returns the number of emitted metrics and of failed databases.
async fn collect_host<C: Connector>(
    config: &InfluxConfig,
    connector: &C,
    host: &HostSpec,
    sink: &dyn MetricSink,
) -> Result<(usize, usize), CollectError> {
    let mut client = connector.connect(host, &config.credentials)?;

    let databases = if config.databases.is_empty() {
        let discovered = client.list_databases().await?;
        debug!(databases = ?discovered, "discovered databases");
        discovered
    } else {
        config.databases.clone()
    };

    let extraction = stats::extract(&mut client, &databases).await?;

    for record in &extraction.stats {
        let name = metric_name(host.alias.as_deref(), &record.metric_key);
        sink.publish(&name, record.value);
    }

    Ok((extraction.stats.len(), extraction.failures.len()))
}
