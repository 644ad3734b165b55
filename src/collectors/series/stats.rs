use super::client::{InfluxClient, LIST_SERIES};
use super::error::CollectError;
use tracing::{debug, error, info_span, warn};
use tracing_futures::Instrument as _;

/// Suffix appended to the database name to form the metric key.
pub const SERIES_COUNT_SUFFIX: &str = "series.count";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatRecord {
    pub metric_key: String,
    pub value: i64,
}

impl StatRecord {
    #[must_use]
    pub fn series_count(database: &str, value: i64) -> Self {
        Self {
            metric_key: format!("{database}.{SERIES_COUNT_SUFFIX}"),
            value,
        }
    }
}

/// Outcome of extracting stats from one host, in database order.
#[derive(Debug, Default)]
pub struct Extraction {
    pub stats: Vec<StatRecord>,
    pub failures: Vec<(String, CollectError)>,
}

/// Count the series of every database, sequentially on one client.
///
/// Database-scoped failures are recorded in [`Extraction::failures`] and the remaining
/// databases are still queried.
///
/// # Errors
///
/// Returns `CollectError::Connect` as soon as the host turns out to be unreachable.
pub async fn extract<C>(client: &mut C, databases: &[String]) -> Result<Extraction, CollectError>
where
    C: InfluxClient + ?Sized,
{
    let mut extraction = Extraction::default();

    for database in databases {
        debug!(database = %database, "gathering stats");

        match series_count(client, database).await {
            Ok(count) => extraction
                .stats
                .push(StatRecord::series_count(database, count)),
            Err(e) if e.is_host_scoped() => return Err(e),
            Err(e) => {
                if let CollectError::EmptyResult { .. } = e {
                    error!(database = %database, error = %e, "unexpected empty response");
                } else {
                    warn!(database = %database, error = %e, "failed to gather stats");
                }
                extraction.failures.push((database.clone(), e));
            }
        }
    }

    Ok(extraction)
}

async fn series_count<C>(client: &mut C, database: &str) -> Result<i64, CollectError>
where
    C: InfluxClient + ?Sized,
{
    client.select_database(database);

    let span = info_span!(
        "db.query",
        db.system = "influxdb",
        db.name = %database,
        db.statement = LIST_SERIES,
        otel.kind = "client"
    );
    let blocks = client.query(LIST_SERIES).instrument(span).await?;

    let first = blocks.first().ok_or_else(|| CollectError::EmptyResult {
        database: database.to_string(),
    })?;

    i64::try_from(first.points.len()).map_err(|e| CollectError::Query {
        reason: format!("series count for {database} out of range: {e}"),
    })
}
