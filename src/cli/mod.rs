pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;

/// Parse the command line, set up logging and resolve the action to run.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized or the arguments are invalid
pub fn start() -> Result<actions::Action> {
    let matches = commands::new().get_matches();

    telemetry::init(matches.get_count("verbose"))?;

    dispatch::handler(&matches)
}
