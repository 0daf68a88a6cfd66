mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod event;
mod library;
mod logging;
mod query;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

use crate::cli::Action;
use crate::event::EventHandler;

#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(about = "Browse, edit and borrow books from a library service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bookshelf/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Library service URL, overriding config and BOOKSHELF_API_URL
  #[arg(short, long, global = true)]
  url: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(flatten)]
  Action(Action),
  /// Interactive session sharing one cache across commands (default)
  Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override service URL if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let _log_guard = logging::init(&config.log)?;
  info!(url = %config.api.url, cache = config.cache.enabled, "starting");

  let mut app = app::App::new(config, Box::new(std::io::stdout()))?;
  match args.command.unwrap_or(Command::Shell) {
    Command::Action(action) => app.run_once(action, EventHandler::stdin).await?,
    Command::Shell => {
      let mut events = EventHandler::stdin();
      app.run_shell(&mut events).await?;
    }
  }

  Ok(())
}
