use crate::{
    cli::actions::Action,
    collectors::{
        COLLECTOR_NAMES, CollectorType,
        config::{Credentials, InfluxConfig, normalize_list},
    },
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;
use tracing::info;

/// # Errors
///
/// Returns an error if required arguments are missing
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = influx_config(matches)?;

    info!(
        hosts = ?config.hosts,
        databases = ?config.databases,
        login = %config.credentials.login,
        "configured influxdb targets"
    );

    if matches.get_flag("once") {
        let path = matches
            .get_one::<String>("path")
            .cloned()
            .unwrap_or_default();
        return Ok(Action::Once { config, path });
    }

    // Get the port or return an error
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // Get the listen address (None means auto-detect)
    let listen = matches
        .get_one::<String>("listen")
        .map(std::string::ToString::to_string);

    Ok(Action::Run {
        port,
        listen,
        config,
        collectors: get_enabled_collectors(matches),
    })
}

/// Build the cycle configuration; list options are normalized here once.
///
/// # Errors
///
/// Returns an error if no host remains after normalization, or if the credentials or
/// the timeout are missing
pub fn influx_config(matches: &ArgMatches) -> Result<InfluxConfig> {
    let login = matches
        .get_one::<String>("login")
        .cloned()
        .ok_or_else(|| anyhow!("Login is required. Please provide it using the --login flag."))?;

    let password = SecretString::from(
        matches
            .get_one::<String>("password")
            .cloned()
            .ok_or_else(|| {
                anyhow!("Password is required. Please provide it using the --password flag.")
            })?,
    );

    let timeout = matches
        .get_one::<u64>("timeout")
        .copied()
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("Timeout is required. Please provide it using the --timeout flag."))?;

    let hosts = list_values(matches, "hosts");
    if hosts.is_empty() {
        return Err(anyhow!(
            "At least one host is required. Please provide it using the --hosts flag."
        ));
    }

    Ok(InfluxConfig::new()
        .with_hosts(hosts)
        .with_databases(list_values(matches, "database"))
        .with_credentials(Credentials::new(login, password))
        .with_timeout(timeout))
}

fn list_values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(normalize_list)
        .unwrap_or_default()
}

#[must_use]
pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    COLLECTOR_NAMES
        .iter()
        .filter(|&name| {
            let enable_flag = format!("collector.{name}");
            let disable_flag = format!("no-collector.{name}");

            // If explicitly disabled, skip it
            if matches.get_flag(&disable_flag) {
                return false;
            }

            // If explicitly enabled, include it
            if matches.get_flag(&enable_flag) {
                return true;
            }

            // Otherwise, check the collector's default setting
            CollectorType::enabled_by_default_for(name)
        })
        .map(|&name| name.to_string())
        .collect()
}
