//! Prometheus exporter for `InfluxDB` series cardinality.
//!
//! Every scrape runs one collection cycle: parse the configured `[alias@]host[:port]`
//! tokens, connect to each host, list its databases (or use the configured ones) and
//! publish the number of series per database as `[alias.]<database>.series.count`.

pub mod cli;
pub mod collectors;
pub mod exporter;
