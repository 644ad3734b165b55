pub mod collectors;

use crate::collectors::config::{DEFAULT_HOST, DEFAULT_LOGIN, DEFAULT_PASSWORD};
use clap::{Arg, ArgAction, Command};

pub const DEFAULT_EXPORTER_PORT: &str = "9122";
pub const DEFAULT_TIMEOUT_SECS: &str = "5";
pub const DEFAULT_GRAPHITE_PATH: &str = "influxdb";

#[must_use]
pub fn new() -> Command {
    let cmd = Command::new("influxdb_exporter")
        .about("Exports InfluxDB series counts for Prometheus")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("hosts")
                .long("hosts")
                .help("InfluxDB hosts as [alias@]host[:port]; the alias prefixes every metric name")
                .env("INFLUXDB_EXPORTER_HOSTS")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .default_value(DEFAULT_HOST),
        )
        .arg(
            Arg::new("login")
                .long("login")
                .help("Login used for every host")
                .env("INFLUXDB_EXPORTER_LOGIN")
                .default_value(DEFAULT_LOGIN),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password used for every host")
                .env("INFLUXDB_EXPORTER_PASSWORD")
                .hide_env_values(true)
                .default_value(DEFAULT_PASSWORD),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .help("Databases to collect (database1,database2); all databases when omitted")
                .env("INFLUXDB_EXPORTER_DATABASE")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Connect and request timeout in seconds for every host")
                .env("INFLUXDB_EXPORTER_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value(DEFAULT_TIMEOUT_SECS),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .env("INFLUXDB_EXPORTER_PORT")
                .value_parser(clap::value_parser!(u16))
                .default_value(DEFAULT_EXPORTER_PORT),
        )
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .help("Address to listen on [default: :: with fallback to 0.0.0.0]")
                .env("INFLUXDB_EXPORTER_LISTEN"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Collect once, print Graphite plaintext lines to stdout and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .help("Graphite path prefix used with --once")
                .env("INFLUXDB_EXPORTER_PATH")
                .default_value(DEFAULT_GRAPHITE_PATH),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug, -vvv for trace")
                .action(ArgAction::Count),
        );

    collectors::add_collectors_args(cmd)
}
