//! Layered runtime settings: built-in defaults, an optional TOML file, then
//! environment variables (a `.env` file is honoured).

use std::{
    fs,
    num::ParseIntError,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use sortwater_core::{StepsThresholds, TargetDistribution};
use sortwater_system_ingestion::IngestConfig;
use sortwater_system_walker::{WalkConfig, DEFAULT_MAX_STEPS, DEFAULT_WALKS_PER_BOARD};
use thiserror::Error;
use tracing::debug;

const DEFAULT_DATABASE: &str = "sortwater.db";

/// Settings shared by every subcommand.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) target_distrib: TargetDistribution,
    pub(crate) steps_thresholds: StepsThresholds,
    pub(crate) window_levels: u64,
    pub(crate) max_generate_attempts: u32,
    pub(crate) max_steps_per_game: usize,
    pub(crate) walks_per_board: usize,
    pub(crate) batch_multiplier: usize,
    pub(crate) verify_solutions: bool,
    pub(crate) database: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let ingest = IngestConfig::default();
        Self {
            target_distrib: ingest.target,
            steps_thresholds: ingest.thresholds,
            window_levels: ingest.window,
            max_generate_attempts: ingest.max_attempts,
            max_steps_per_game: DEFAULT_MAX_STEPS,
            walks_per_board: DEFAULT_WALKS_PER_BOARD,
            batch_multiplier: ingest.batch_multiplier,
            verify_solutions: ingest.verify_solutions,
            database: PathBuf::from(DEFAULT_DATABASE),
        }
    }
}

impl Settings {
    /// Resolves settings from the process environment and an optional file.
    pub(crate) fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    /// Resolves settings from an optional file and an arbitrary variable lookup.
    pub(crate) fn from_sources(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut settings = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(lookup)?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), SettingsError> {
        if let Some(raw) = lookup("TARGET_DISTRIB") {
            self.target_distrib = parse_json("TARGET_DISTRIB", &raw)?;
        }
        if let Some(raw) = lookup("STEPS_THRESHOLDS") {
            self.steps_thresholds = parse_json("STEPS_THRESHOLDS", &raw)?;
        }
        if let Some(raw) = lookup("WINDOW_LEVELS") {
            self.window_levels = parse_int("WINDOW_LEVELS", &raw)?;
        }
        if let Some(raw) = lookup("MAX_GENERATE_ATTEMPTS") {
            self.max_generate_attempts = parse_int("MAX_GENERATE_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("MAX_STEPS_PER_GAME") {
            self.max_steps_per_game = parse_int("MAX_STEPS_PER_GAME", &raw)?;
        }
        if let Some(raw) = lookup("SORTWATER_DB").filter(|raw| !raw.trim().is_empty()) {
            self.database = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Orchestrator configuration derived from these settings.
    pub(crate) fn ingest_config(&self, shuffle_seed: Option<u64>) -> IngestConfig {
        IngestConfig {
            thresholds: self.steps_thresholds.clone(),
            target: self.target_distrib.clone(),
            window: self.window_levels,
            max_attempts: self.max_generate_attempts,
            batch_multiplier: self.batch_multiplier,
            verify_solutions: self.verify_solutions,
            shuffle_seed,
        }
    }

    /// Walk limits used by the simulated proposer.
    pub(crate) fn walk_config(&self) -> WalkConfig {
        WalkConfig::new(self.max_steps_per_game, self.walks_per_board)
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(
    var: &'static str,
    raw: &str,
) -> Result<T, SettingsError> {
    serde_json::from_str(raw).map_err(|source| SettingsError::Json { var, source })
}

fn parse_int<T: std::str::FromStr<Err = ParseIntError>>(
    var: &'static str,
    raw: &str,
) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|source| SettingsError::Integer {
        var,
        value: raw.to_owned(),
        source,
    })
}

/// Reasons settings cannot be resolved.
#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{var} is not valid JSON: {source}")]
    Json {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{var} must be a non-negative integer, got `{value}`")]
    Integer {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}
