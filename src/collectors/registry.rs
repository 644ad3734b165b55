use crate::collectors::config::{CollectorConfig, InfluxConfig};
use crate::collectors::exporter::ScraperCollector;
use crate::collectors::{COLLECTOR_NAMES, Collector, CollectorType};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tracing::{debug, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// Enabled collectors sharing one prometheus registry.
pub struct CollectorRegistry {
    collectors: Vec<CollectorType>,
    registry: Registry,
    scraper: Option<Arc<ScraperCollector>>,
}

impl CollectorRegistry {
    #[must_use]
    pub fn new(config: &CollectorConfig) -> Self {
        let registry = Registry::new();
        let mut collectors = Vec::new();
        let mut scraper = None;

        for &name in COLLECTOR_NAMES {
            if !config.is_enabled(name) {
                continue;
            }

            let Some(collector) = CollectorType::from_name(name) else {
                continue;
            };

            if let Err(e) = collector.register_metrics(&registry) {
                warn!(collector = name, error = %e, "failed to register collector, skipping");
                continue;
            }

            if let Some(s) = collector.get_scraper() {
                scraper = Some(s);
            }

            debug!(collector = name, "enabled collector");
            collectors.push(collector);
        }

        Self {
            collectors,
            registry,
            scraper,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    /// Run every enabled collector once and encode the registry in text format.
    ///
    /// A failing collector is logged and recorded by the scraper; its last successful
    /// values stay exported.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the gathered metrics fails.
    #[instrument(skip(self, config), level = "info", err)]
    pub async fn collect_all(&self, config: &InfluxConfig) -> Result<String> {
        if let Some(scraper) = &self.scraper {
            scraper.scrape_started();
        }

        let mut tasks = FuturesUnordered::new();

        for collector in &self.collectors {
            let name = collector.name();
            let timer = self.scraper.as_ref().map(|s| s.start_scrape(name));
            let span = info_span!("collector.collect", collector = name, otel.kind = "internal");

            tasks.push(
                async move {
                    let res = collector.collect(config).await;
                    if let Some(timer) = timer {
                        if res.is_ok() {
                            timer.success();
                        } else {
                            timer.error();
                        }
                    }
                    (name, res)
                }
                .instrument(span),
            );
        }

        while let Some((name, res)) = tasks.next().await {
            if let Err(e) = res {
                warn!(collector = name, error = %e, "collector failed");
            }
        }

        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        let body = String::from_utf8(buffer)?;

        // visible on the next scrape
        if let Some(scraper) = &self.scraper {
            let samples = body
                .lines()
                .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
                .count();
            scraper.set_samples(samples);
        }

        Ok(body)
    }
}
