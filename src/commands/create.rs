use anyhow::{bail, Context};
use burnbin::NewPaste;
use regex::Regex;
use tokio::io::AsyncReadExt;

use crate::App;

#[derive(clap::Args)]
pub struct Args {
    /// Language tag shown alongside the paste.
    #[arg(short, long, default_value = "text")]
    language: String,

    /// Delete the paste the first time it is read.
    #[arg(short, long)]
    burn: bool,

    /// Expire the paste this many seconds from now.
    #[arg(short, long, value_name = "SECS")]
    expires_in: Option<u64>,
}

pub async fn run(app: &App, args: Args) -> anyhow::Result<()> {
    validate_language(&args.language)?;

    let max_size = app.config.limits.max_paste_size;
    let mut bytes = Vec::new();
    tokio::io::stdin()
        .take(read_limit(max_size))
        .read_to_end(&mut bytes)
        .await
        .context("failed to read paste from stdin")?;
    let content = decode_paste(bytes, max_size)?;

    let expiry_at = match args.expires_in {
        Some(secs) => {
            let ttl = chrono::Duration::from_std(std::time::Duration::from_secs(secs))
                .context("expiry is too far in the future")?;
            let expiry_at = app
                .service
                .now()
                .checked_add_signed(ttl)
                .context("expiry is too far in the future")?;
            Some(expiry_at)
        }
        None => None,
    };

    let new_paste = NewPaste::new(content, args.language)
        .burn(args.burn)
        .expiry_at(expiry_at);
    let id = match app.service.create(new_paste, app.deadline()).await {
        Ok(id) => id,
        Err(e) if e.is_retryable() => {
            return Err(e).context("failed to store paste, try again later")
        }
        Err(e) => return Err(e).context("failed to store paste"),
    };

    println!("{id}");
    Ok(())
}

/// One byte past the limit, so oversized input is detectable.
fn read_limit(max_size: usize) -> u64 {
    u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1)
}

/// Size is checked before decoding so a cut inside a multi-byte character
/// still reports the size.
fn decode_paste(bytes: Vec<u8>, max_size: usize) -> anyhow::Result<String> {
    if bytes.len() > max_size {
        bail!("paste is larger than {max_size} bytes");
    }
    String::from_utf8(bytes).context("paste is not valid UTF-8")
}

fn validate_language(language: &str) -> anyhow::Result<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9+#._-]{0,31}$")?;
    if !pattern.is_match(language) {
        bail!("invalid language tag: {language:?}");
    }
    Ok(())
}
