#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that curates generated sort-water levels into a store.

mod commands;
mod settings;

use std::{path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::settings::Settings;

/// Exit code for malformed invocations and fatal errors.
const EXIT_FATAL: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "sortwater")]
#[command(about = "Curates generated sort-water levels into a balanced level store")]
#[command(version)]
struct Cli {
    /// TOML settings file applied on top of the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Level database, overriding SORTWATER_DB and the settings file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Request candidates from a model and insert up to COUNT new levels
    Ingest {
        /// Model identifier, `N_K_L` for the built-in simulated model
        model: String,

        /// Number of levels to insert
        count: usize,

        /// Read candidates from a JSON file instead of simulating the model
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Seed for candidate shuffling and simulated generation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the stored difficulty mix against the target distribution
    Stats,

    /// Replay every stored solution and report the ones that do not solve their level
    Verify,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_FATAL),
            };
        }
    };

    init_tracing();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            error!("{error:#}");
            eprintln!("error: {error:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.database = db;
    }

    match cli.command {
        Commands::Ingest {
            model,
            count,
            candidates,
            seed,
        } => commands::ingest(&settings, &model, count, candidates.as_deref(), seed),
        Commands::Stats => commands::stats(&settings),
        Commands::Verify => commands::verify(&settings),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
