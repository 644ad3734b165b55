mod scraper;

pub use scraper::{ScrapeTimer, ScraperCollector};

use crate::collectors::Collector;
use crate::collectors::config::InfluxConfig;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::Registry;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Exporter self-monitoring
#[derive(Clone)]
pub struct ExporterCollector {
    scraper: Arc<ScraperCollector>,
}

impl Default for ExporterCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scraper: Arc::new(ScraperCollector::new()),
        }
    }

    #[must_use]
    pub const fn get_scraper(&self) -> &Arc<ScraperCollector> {
        &self.scraper
    }
}

impl Collector for ExporterCollector {
    fn name(&self) -> &'static str {
        "exporter"
    }

    #[instrument(
        skip(self, registry),
        level = "info",
        err,
        fields(collector = "exporter")
    )]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.scraper.register(registry)?;
        debug!(collector = self.name(), "registered exporter metrics");
        Ok(())
    }

    // scrape metrics are recorded by the registry around every collector
    fn collect<'a>(&'a self, _config: &'a InfluxConfig) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Ok(()) })
    }

    fn enabled_by_default(&self) -> bool {
        false
    }
}
