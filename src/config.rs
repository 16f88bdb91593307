// src/config.rs
//
// Tunables for the generator and the optional TOML file read by the CLI.
// Every field has a default, so an empty or missing file is valid.

use crate::constants::*;
use crate::error::AppError;
use crate::models::{DifficultySettings, Operation};
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Knobs for the progressive difficulty curve. `Default` reproduces the
/// tuned values from `constants`; changing them changes what users see.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub streak_cap: f64,
    pub min_window_fraction: f64,
    pub min_window_size: i32,
    pub weight_ramp: f64,
    pub min_divisor: i32,
    pub min_quotient: i32,
    pub max_divisor: i32,
    pub division_attempts: usize,
    pub max_distractor_distance_factor: i64,
    pub max_distractor_distance_cap: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            streak_cap: STREAK_CAP,
            min_window_fraction: MIN_WINDOW_FRACTION,
            min_window_size: MIN_WINDOW_SIZE,
            weight_ramp: WEIGHT_RAMP,
            min_divisor: MIN_DIVISOR,
            min_quotient: MIN_QUOTIENT,
            max_divisor: PRACTICAL_MAX_DIVISOR,
            division_attempts: DIVISION_ATTEMPTS,
            max_distractor_distance_factor: MAX_DISTRACTOR_DISTANCE_FACTOR,
            max_distractor_distance_cap: MAX_DISTRACTOR_DISTANCE_CAP,
        }
    }
}

impl GeneratorConfig {
    /// Streak progress in [0, 1].
    pub fn progress(&self, streak: u32) -> f64 {
        (streak as f64 / self.streak_cap).clamp(0.0, 1.0)
    }

    /// Smallest operand drawn for `op`.
    pub fn min_operand(&self, op: Operation) -> i32 {
        match op {
            Operation::Multiplication | Operation::Division => self.min_divisor.max(MIN_OPERAND),
            Operation::Addition | Operation::Subtraction => MIN_OPERAND,
        }
    }

    /// The upper bound actually used for `op`: the configured maximum,
    /// raised to the operation's minimum operand when it is degenerate.
    pub fn effective_max(&self, settings: &DifficultySettings, op: Operation) -> i32 {
        settings.max_number.max(self.min_operand(op))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; `None` means `~/.math-hero.db`.
    pub database_path: Option<PathBuf>,
    /// Explanation templates; `None` uses the bundled set.
    pub templates_path: Option<PathBuf>,
    pub max_history: usize,
    pub archive_size: usize,
    pub generator: GeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            templates_path: None,
            max_history: MAX_PROGRESS_ENTRIES,
            archive_size: MAX_ARCHIVE_SIZE,
            generator: GeneratorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&raw)?;
        info!("Loaded config from {:?}", path);
        Ok(cfg)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
