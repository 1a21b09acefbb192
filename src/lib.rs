pub mod capture;
pub mod commands;
pub mod db;
pub mod extraction;
pub mod input;
pub mod models;
pub mod recognition;
pub mod settings;
pub mod storage;
pub mod supervisor;
pub mod utils;

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use settings::DEFAULT_CONFIG_PATH;

/// Periodic desktop capture with text recognition around pointer clicks.
#[derive(Debug, Parser)]
#[command(name = "screenshot-ocr", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture and watch for clicks until Ctrl-C or SIGTERM.
    Start {
        /// JSON configuration; written with defaults when missing.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Write logs to this file instead of stderr.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Print the last status snapshot of a running or finished run.
    Status {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// List recently recognized text from the catalog.
    History {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    // Reads RUST_LOG on top of the info default
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info).parse_default_env();

    if let Some(path) = log_file {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start { config, log_file } => {
            init_logging(log_file.as_ref())?;
            log::info!("Screenshot OCR starting up...");
            commands::start(&config).await
        }
        Command::Status { config } => {
            init_logging(None)?;
            commands::status(&config)
        }
        Command::History { config, limit } => {
            init_logging(None)?;
            commands::history(&config, limit).await
        }
    }
}
