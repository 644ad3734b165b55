use anyhow::Result;
use influxdb_exporter::cli::{actions, start};

#[tokio::main]
async fn main() -> Result<()> {
    let action = start()?;

    actions::run::handle(action).await?;

    Ok(())
}
