mod cli;
mod db;
mod error;
mod fmt;
mod models;
mod movements;
mod pipeline;
mod reference;
mod settings;
mod sheet;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;
use settings::{expand_path, load_settings, settings_path};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let settings_file = cli
        .config
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(settings_path);
    let settings = load_settings(&settings_file)?;

    match cli.command {
        None => cli::load::run(&settings.resolve(None, None, None)),
        Some(Commands::Load { file, db, sheet }) => {
            cli::load::run(&settings.resolve(file.as_deref(), db.as_deref(), sheet.as_deref()))
        }
        Some(Commands::Init { db }) => cli::init::run(&settings.resolve(None, db.as_deref(), None).db),
        Some(Commands::Status { db }) => {
            cli::status::run(&settings.resolve(None, db.as_deref(), None).db)
        }
        Some(Commands::Config { input, db, sheet }) => {
            cli::config::run(&settings_file, input, db, sheet)
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}
