// src/lib.rs

pub mod analytics;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod generator;
pub mod models;
pub mod pedagogy;
pub mod repository;
pub mod templates;

pub use analytics::{analyze, analyze_with};
pub use error::AppError;
pub use generator::ProblemGenerator;
