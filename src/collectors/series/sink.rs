//! Destinations for the metrics produced by a collection cycle.

use prometheus::IntGaugeVec;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Receives the published `(name, value)` pairs of a cycle.
///
/// Implementations must tolerate calls from any thread.
pub trait MetricSink: Send + Sync {
    fn publish(&self, name: &str, value: i64);

    /// Availability of a host at the end of its processing.
    fn host_up(&self, _host: &str, _up: bool) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("sink lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Stages a cycle in memory and swaps it into Prometheus gauges on [`GaugeSink::flush`].
pub struct GaugeSink<'a> {
    series_count: &'a IntGaugeVec,
    up: &'a IntGaugeVec,
    staged: Mutex<Vec<(String, i64)>>,
    hosts: Mutex<Vec<(String, bool)>>,
}

impl<'a> GaugeSink<'a> {
    #[must_use]
    pub const fn new(series_count: &'a IntGaugeVec, up: &'a IntGaugeVec) -> Self {
        Self {
            series_count,
            up,
            staged: Mutex::new(Vec::new()),
            hosts: Mutex::new(Vec::new()),
        }
    }

    /// Replace the previously exported values with this cycle's values.
    ///
    /// Returns the number of series samples written.
    pub fn flush(&self) -> usize {
        let staged = std::mem::take(&mut *lock(&self.staged));
        let hosts = std::mem::take(&mut *lock(&self.hosts));

        self.series_count.reset();
        for (name, value) in &staged {
            self.series_count.with_label_values(&[name.as_str()]).set(*value);
        }

        self.up.reset();
        for (host, up) in &hosts {
            self.up
                .with_label_values(&[host.as_str()])
                .set(i64::from(*up));
        }

        staged.len()
    }
}

impl MetricSink for GaugeSink<'_> {
    fn publish(&self, name: &str, value: i64) {
        lock(&self.staged).push((name.to_string(), value));
    }

    fn host_up(&self, host: &str, up: bool) {
        lock(&self.hosts).push((host.to_string(), up));
    }
}

/// Writes Graphite plaintext lines: `<path>.<name> <value> <timestamp>`.
pub struct GraphiteSink<W> {
    path: String,
    timestamp: i64,
    out: Mutex<W>,
}

impl<W: Write + Send> GraphiteSink<W> {
    /// All lines of the sink share the timestamp taken here.
    #[must_use]
    pub fn new(path: impl Into<String>, out: W) -> Self {
        Self::with_timestamp(path, out, chrono::Utc::now().timestamp())
    }

    #[must_use]
    pub fn with_timestamp(path: impl Into<String>, out: W, timestamp: i64) -> Self {
        Self {
            path: path.into(),
            timestamp,
            out: Mutex::new(out),
        }
    }

    fn line(&self, name: &str, value: i64) -> String {
        let path = self.path.trim_matches('.');
        if path.is_empty() {
            format!("{name} {value} {}\n", self.timestamp)
        } else {
            format!("{path}.{name} {value} {}\n", self.timestamp)
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> MetricSink for GraphiteSink<W> {
    fn publish(&self, name: &str, value: i64) {
        let line = self.line(name, value);
        let mut out = lock(&self.out);
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|()| out.flush()) {
            warn!(metric = name, error = %e, "failed to write metric");
        }
    }
}

/// Keeps everything it receives, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<(String, i64)>>,
    hosts: Mutex<Vec<(String, bool)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn published(&self) -> Vec<(String, i64)> {
        lock(&self.published).clone()
    }

    #[must_use]
    pub fn hosts(&self) -> Vec<(String, bool)> {
        lock(&self.hosts).clone()
    }
}

impl MetricSink for MemorySink {
    fn publish(&self, name: &str, value: i64) {
        lock(&self.published).push((name.to_string(), value));
    }

    fn host_up(&self, host: &str, up: bool) {
        lock(&self.hosts).push((host.to_string(), up));
    }
}
