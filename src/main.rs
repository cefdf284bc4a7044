mod app;
mod cache;
mod config;
mod connectivity;
mod loader;
mod pokeapi;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{App, Command};
use crate::cache::{MemoryStorage, NoopStorage, SqliteStorage};
use crate::config::{Config, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "pokepage")]
#[command(about = "Browse Pokémon page by page, with an offline page cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pokepage/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Treat the network as down: no connectivity probe, no background refresh
  #[arg(long)]
  offline: bool,

  /// Keep the page cache in memory for this run only
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

  let Some(log_path) = &config.file else {
    tracing_subscriber::registry()
      .with(filter)
      .with(fmt::layer().with_writer(std::io::stderr))
      .init();
    return Ok(None);
  };

  let dir = log_path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  let file_name = log_path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", log_path.display()))?;

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  info!(path = %log_path.display(), "Logging initialized");
  Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_logging(&config.logging)?;

  let command = args.command.unwrap_or_default();

  if args.no_cache {
    App::new(&config, MemoryStorage::new(), args.offline)?
      .run(command)
      .await
  } else if !config.cache.enabled {
    App::new(&config, NoopStorage, args.offline)?.run(command).await
  } else {
    let store = SqliteStorage::open(config.cache.path.as_deref())?;
    App::new(&config, store, args.offline)?.run(command).await
  }
}
