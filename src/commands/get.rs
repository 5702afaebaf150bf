use anyhow::{bail, Context};
use burnbin::StoreError;
use tokio::io::AsyncWriteExt;

use crate::App;

#[derive(clap::Args)]
pub struct Args {
    /// Paste id.
    id: String,

    /// Print the paste and its metadata as JSON.
    #[arg(long)]
    json: bool,
}

pub async fn run(app: &App, args: Args) -> anyhow::Result<()> {
    let paste = match app.service.get(&args.id, app.deadline()).await {
        Ok(paste) => paste,
        Err(StoreError::NotFound) => bail!("no such paste: {}", args.id),
        Err(e) if e.is_retryable() => {
            return Err(e).context("failed to fetch paste, try again later")
        }
        Err(e) => return Err(e).context("failed to fetch paste"),
    };

    let mut stdout = tokio::io::stdout();
    if args.json {
        let mut json = serde_json::to_vec_pretty(&paste)?;
        json.push(b'\n');
        stdout.write_all(&json).await?;
    } else {
        stdout.write_all(paste.content.as_bytes()).await?;
    }
    stdout.flush().await?;

    Ok(())
}
