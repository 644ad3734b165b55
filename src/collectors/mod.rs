use anyhow::Result;
use config::InfluxConfig;
use futures::future::BoxFuture;
use prometheus::Registry;
use std::sync::Arc;

pub mod config;
pub mod exporter;
pub mod registry;
pub mod series;

pub use exporter::{ExporterCollector, ScraperCollector};
pub use series::SeriesCollector;

pub trait Collector {
    fn name(&self) -> &'static str;

    /// Register metrics with the prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    fn register_metrics(&self, registry: &Registry) -> Result<()>;

    /// Run one collection against the configured `InfluxDB` hosts.
    fn collect<'a>(&'a self, config: &'a InfluxConfig) -> BoxFuture<'a, Result<()>>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

/// Names accepted by `--collector.<name>`, in the order collectors run and register.
pub const COLLECTOR_NAMES: &[&str] = &["series", "exporter"];

/// Every collector the exporter knows about.
#[derive(Clone)]
pub enum CollectorType {
    Series(SeriesCollector),
    Exporter(ExporterCollector),
}

impl CollectorType {
    /// Build the collector registered under `name`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "series" => Some(Self::Series(SeriesCollector::new())),
            "exporter" => Some(Self::Exporter(ExporterCollector::new())),
            _ => None,
        }
    }

    /// Whether `name` is collected without an explicit `--collector.<name>`.
    #[must_use]
    pub fn enabled_by_default_for(name: &str) -> bool {
        Self::from_name(name).is_some_and(|c| c.enabled_by_default())
    }

    /// The scrape tracker, only carried by the exporter collector.
    #[must_use]
    pub fn get_scraper(&self) -> Option<Arc<ScraperCollector>> {
        if let Self::Exporter(c) = self {
            Some(Arc::clone(c.get_scraper()))
        } else {
            None
        }
    }

    fn inner(&self) -> &dyn Collector {
        match self {
            Self::Series(c) => c,
            Self::Exporter(c) => c,
        }
    }
}

impl Collector for CollectorType {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.inner().register_metrics(registry)
    }

    fn collect<'a>(&'a self, config: &'a InfluxConfig) -> BoxFuture<'a, Result<()>> {
        self.inner().collect(config)
    }

    fn enabled_by_default(&self) -> bool {
        self.inner().enabled_by_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_builds_a_collector() {
        for &name in COLLECTOR_NAMES {
            let collector = CollectorType::from_name(name);
            assert!(
                matches!(collector, Some(ref c) if c.name() == name),
                "{name} should build a collector reporting the same name"
            );
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(CollectorType::from_name("innodb").is_none());
        assert!(!CollectorType::enabled_by_default_for("innodb"));
    }

    #[test]
    fn test_only_series_is_enabled_by_default() {
        assert!(CollectorType::enabled_by_default_for("series"));
        assert!(!CollectorType::enabled_by_default_for("exporter"));
    }

    #[test]
    fn test_only_exporter_has_scraper() {
        for &name in COLLECTOR_NAMES {
            let scraper = CollectorType::from_name(name).and_then(|c| c.get_scraper());
            assert_eq!(scraper.is_some(), name == "exporter");
        }
    }

    #[test]
    fn test_register_metrics_on_shared_registry() {
        let registry = Registry::new();

        for &name in COLLECTOR_NAMES {
            let Some(collector) = CollectorType::from_name(name) else {
                unreachable!("registered name");
            };
            assert!(
                collector.register_metrics(&registry).is_ok(),
                "Collector '{name}' failed to register metrics"
            );
        }
    }
}
