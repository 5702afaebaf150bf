use anyhow::Context;
use tracing::info;

use crate::App;

pub async fn run(app: &App) -> anyhow::Result<()> {
    app.service
        .repository()
        .migrate(app.deadline())
        .await
        .context("failed to create schema")?;
    info!("schema ready");
    Ok(())
}
