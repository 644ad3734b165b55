use anyhow::Result;
use prometheus::core::Collector as MetricCollector;
use prometheus::{
    CounterVec, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry,
};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const LABELS: &[&str] = &["collector"];

// a series cycle walks every host sequentially, each bounded by --timeout
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Per-collector scrape outcome plus exporter-wide scrape totals.
#[derive(Clone)]
pub struct ScraperCollector {
    duration: HistogramVec,
    errors: CounterVec,
    last_timestamp: GaugeVec,
    last_success: GaugeVec,
    samples: IntGauge,
    scrapes: IntCounter,
}

impl Default for ScraperCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let gauge = |name: &str, help: &str| {
            GaugeVec::new(Opts::new(name, help), LABELS).expect("valid scrape gauge opts")
        };

        Self {
            duration: HistogramVec::new(
                HistogramOpts::new(
                    "influxdb_exporter_collector_scrape_duration_seconds",
                    "Time spent running each collector in seconds",
                )
                .buckets(DURATION_BUCKETS.to_vec()),
                LABELS,
            )
            .expect("valid scrape duration opts"),
            errors: CounterVec::new(
                Opts::new(
                    "influxdb_exporter_collector_scrape_errors_total",
                    "Collector runs that failed, e.g. every influxdb host unreachable",
                ),
                LABELS,
            )
            .expect("valid scrape errors opts"),
            last_timestamp: gauge(
                "influxdb_exporter_collector_last_scrape_timestamp_seconds",
                "Unix timestamp of the last run per collector",
            ),
            last_success: gauge(
                "influxdb_exporter_collector_last_scrape_success",
                "Whether the last run per collector succeeded (1 = success, 0 = failure)",
            ),
            samples: IntGauge::new(
                "influxdb_exporter_metrics_total",
                "Number of samples exported by the previous scrape",
            )
            .expect("valid metrics total opts"),
            scrapes: IntCounter::new(
                "influxdb_exporter_scrapes_total",
                "Scrapes of /metrics since start",
            )
            .expect("valid scrapes total opts"),
        }
    }

    fn metrics(&self) -> Vec<Box<dyn MetricCollector>> {
        vec![
            Box::new(self.duration.clone()),
            Box::new(self.errors.clone()),
            Box::new(self.last_timestamp.clone()),
            Box::new(self.last_success.clone()),
            Box::new(self.samples.clone()),
            Box::new(self.scrapes.clone()),
        ]
    }

    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        for metric in self.metrics() {
            registry.register(metric)?;
        }
        Ok(())
    }

    pub fn scrape_started(&self) {
        self.scrapes.inc();
    }

    /// Sample count of the scrape just encoded, exported on the next one.
    pub fn set_samples(&self, samples: usize) {
        self.samples.set(i64::try_from(samples).unwrap_or(i64::MAX));
    }

    #[must_use]
    pub fn start_scrape(&self, collector: &'static str) -> ScrapeTimer {
        ScrapeTimer {
            collector,
            started: Instant::now(),
            scraper: self.clone(),
            finished: false,
        }
    }

    fn record(&self, collector: &str, started: Instant, ok: bool) {
        let labels = [collector];
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        self.duration
            .with_label_values(&labels)
            .observe(started.elapsed().as_secs_f64());
        self.last_timestamp.with_label_values(&labels).set(now);
        self.last_success
            .with_label_values(&labels)
            .set(if ok { 1.0 } else { 0.0 });

        if !ok {
            self.errors.with_label_values(&labels).inc();
        }
    }
}

/// One collector run; records exactly once, as a success when dropped without an outcome.
pub struct ScrapeTimer {
    collector: &'static str,
    started: Instant,
    scraper: ScraperCollector,
    finished: bool,
}

impl ScrapeTimer {
    pub fn success(self) {
        self.finish(true);
    }

    pub fn error(self) {
        self.finish(false);
    }

    fn finish(mut self, ok: bool) {
        self.finished = true;
        self.scraper.record(self.collector, self.started, ok);
    }
}

impl Drop for ScrapeTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.scraper.record(self.collector, self.started, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> (ScraperCollector, Registry) {
        let scraper = ScraperCollector::new();
        let registry = Registry::new();
        assert!(scraper.register(&registry).is_ok());
        (scraper, registry)
    }

    fn sample(registry: &Registry, prefix: &str) -> Option<f64> {
        let mut buffer = Vec::new();
        prometheus::Encoder::encode(&prometheus::TextEncoder::new(), &registry.gather(), &mut buffer)
            .ok()?;
        String::from_utf8(buffer)
            .ok()?
            .lines()
            .find(|line| line.starts_with(prefix))
            .and_then(|line| line.split_whitespace().last())
            .and_then(|v| v.parse().ok())
    }

    #[test]
    fn test_registering_twice_fails() {
        let (scraper, registry) = registered();
        assert!(scraper.register(&registry).is_err());
    }

    #[test]
    fn test_success_records_duration() {
        let (scraper, registry) = registered();

        scraper.start_scrape("series").success();

        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_scrape_duration_seconds_count"),
            Some(1.0)
        );
        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_last_scrape_success"),
            Some(1.0)
        );
        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_scrape_errors_total"),
            None
        );
    }

    #[test]
    fn test_error_records_once() {
        let (scraper, registry) = registered();

        scraper.start_scrape("series").error();

        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_scrape_errors_total"),
            Some(1.0)
        );
        // the consumed timer must not overwrite the failure when dropped
        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_last_scrape_success"),
            Some(0.0)
        );
        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_scrape_duration_seconds_count"),
            Some(1.0)
        );
    }

    #[test]
    fn test_dropped_timer_counts_as_success() {
        let (scraper, registry) = registered();

        drop(scraper.start_scrape("series"));

        assert_eq!(
            sample(&registry, "influxdb_exporter_collector_last_scrape_success"),
            Some(1.0)
        );
    }

    #[test]
    fn test_scrape_totals() {
        let (scraper, registry) = registered();

        scraper.scrape_started();
        scraper.scrape_started();
        scraper.set_samples(42);

        assert_eq!(sample(&registry, "influxdb_exporter_scrapes_total"), Some(2.0));
        assert_eq!(sample(&registry, "influxdb_exporter_metrics_total"), Some(42.0));
    }
}
