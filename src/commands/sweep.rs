use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{info, warn};

use crate::App;

#[derive(clap::Args)]
pub struct Args {
    /// Keep sweeping at the configured interval until interrupted.
    #[arg(short, long)]
    watch: bool,

    /// Sweep every SECS seconds until interrupted (implies --watch).
    #[arg(long, value_name = "SECS")]
    every: Option<u64>,
}

pub async fn run(app: &App, args: Args) -> anyhow::Result<()> {
    if !args.watch && args.every.is_none() {
        let count = sweep_once(app).await?;
        println!("{count}");
        return Ok(());
    }

    let period = Duration::from_secs(args.every.unwrap_or(app.config.sweep.interval_secs).max(1));
    info!("sweeping every {period:?}");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks =
        std::pin::pin!(IntervalStream::new(interval).take_until(tokio::signal::ctrl_c()));

    while ticks.next().await.is_some() {
        // a failed pass is picked up by the next one
        if let Err(e) = sweep_once(app).await {
            warn!("sweep failed: {e:#}");
        }
    }

    info!("sweeper stopped");
    Ok(())
}

async fn sweep_once(app: &App) -> anyhow::Result<u64> {
    let cutoff = app.service.now();
    Ok(app.service.sweep(cutoff, app.deadline()).await?)
}
