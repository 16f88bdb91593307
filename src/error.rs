// src/error.rs

use crate::models::Operation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("No explanation templates for {0}")]
    MissingTemplates(Operation),

    #[error("Invalid explanation template: {0}")]
    Template(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("No problem is waiting for an answer under seed {0}")]
    NotServed(i64),

    #[error("The daily problem for seed {0} has already been answered")]
    AlreadyAnswered(i64),

    #[error("Unknown difficulty level: {0}. Expected novice, apprentice, adept, expert or master")]
    UnknownDifficulty(String),
}
