use crate::cli::actions::{Action, once};
use crate::exporter::new;
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter fails to start or the single collection fails
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            port,
            listen,
            config,
            collectors,
        } => {
            new(port, listen, config, collectors).await?;
        }
        Action::Once { config, path } => {
            once::handle(&config, &path, std::io::stdout()).await?;
        }
    }

    Ok(())
}
