use crate::collectors::{COLLECTOR_NAMES, CollectorType};
use clap::{Arg, ArgAction, Command};

/// `--collector.<name>` / `--no-collector.<name>` pair for every registered collector.
pub fn add_collectors_args(cmd: Command) -> Command {
    COLLECTOR_NAMES.iter().fold(cmd, |cmd, &name| {
        let default_enabled = CollectorType::enabled_by_default_for(name);

        let enable_flag = format!("collector.{name}");
        let disable_flag = format!("no-collector.{name}");
        let state = if default_enabled { "enabled" } else { "disabled" };

        cmd.arg(
            Arg::new(enable_flag.clone())
                .long(enable_flag.clone())
                .help(format!("Enable the {name} collector [default: {state}]"))
                .action(ArgAction::SetTrue)
                .default_value(if default_enabled { "true" } else { "false" }),
        )
        .arg(
            Arg::new(disable_flag.clone())
                .long(disable_flag)
                .help(format!("Disable the {name} collector"))
                .action(ArgAction::SetTrue)
                .overrides_with(enable_flag),
        )
    })
}

#[cfg(test)]
mod tests {
    use crate::cli::commands;
    use crate::cli::dispatch::get_enabled_collectors;
    use crate::collectors::{COLLECTOR_NAMES, CollectorType};

    fn matches(args: &[&str]) -> clap::ArgMatches {
        let mut argv = vec!["influxdb_exporter"];
        argv.extend_from_slice(args);
        commands::new().get_matches_from(argv)
    }

    #[test]
    fn test_all_collector_flags_are_added() {
        let matches = matches(&[]);

        for &name in COLLECTOR_NAMES {
            assert!(
                matches.contains_id(&format!("collector.{name}")),
                "Missing enable flag for {name}"
            );
            assert!(
                matches.contains_id(&format!("no-collector.{name}")),
                "Missing disable flag for {name}"
            );
        }
    }

    #[test]
    fn test_collector_default_values() {
        let matches = matches(&[]);

        for &name in COLLECTOR_NAMES {
            let expected = CollectorType::enabled_by_default_for(name);
            let actual = matches.get_flag(&format!("collector.{name}"));
            assert_eq!(actual, expected, "Collector '{name}' default mismatch");
        }
    }

    #[test]
    fn test_last_toggle_wins() {
        let enabled = get_enabled_collectors(&matches(&[
            "--collector.series",
            "--no-collector.series",
        ]));
        assert!(
            !enabled.contains(&"series".to_string()),
            "series should be disabled when disable flag comes last"
        );

        let enabled = get_enabled_collectors(&matches(&[
            "--no-collector.series",
            "--collector.series",
        ]));
        assert!(enabled.contains(&"series".to_string()));
    }

    #[test]
    fn test_opt_in_exporter_collector() {
        let enabled = get_enabled_collectors(&matches(&["--collector.exporter"]));
        assert!(enabled.contains(&"series".to_string()));
        assert!(enabled.contains(&"exporter".to_string()));
    }
}
