use std::path::PathBuf;

use anyhow::Context;
use burnbin::config::Config;
use burnbin::db::ConnectionManager;
use burnbin::repository::SqlPasteRepository;
use burnbin::PasteService;
use clap::{Parser, Subcommand};
use directories_next::ProjectDirs;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(version, about = "Store and fetch pastes, optionally expiring or burn-after-read")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overriding the config file.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log more (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the paste table if it does not exist.
    Migrate,
    /// Read a paste from stdin and print its id.
    Create(commands::create::Args),
    /// Print a paste.
    Get(commands::get::Args),
    /// Delete expired pastes, once or on a schedule.
    Sweep(commands::sweep::Args),
}

pub struct App {
    pub config: Config,
    pub service: PasteService<SqlPasteRepository>,
}

impl App {
    /// Deadline for a single store operation started now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.limits.operation_timeout()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path).context("failed to read config")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let conn = ConnectionManager::connect(&config.database, config.retry).await?;
    let app = App {
        service: PasteService::new(SqlPasteRepository::new(conn.clone())),
        config,
    };

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&app).await,
        Command::Create(args) => commands::create::run(&app, args).await,
        Command::Get(args) => commands::get::run(&app, args).await,
        Command::Sweep(args) => commands::sweep::run(&app, args).await,
    };

    conn.close().await;
    result
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries paste content
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "burnbin")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("burnbin.toml"))
}
