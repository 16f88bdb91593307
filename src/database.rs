// src/database.rs

use crate::models::{DifficultyLevel, DifficultySettings};
use crate::repository;
use log::debug;
use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    debug!("[DB] init_db: Checking database schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS problem_results (
            id INTEGER PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            operation TEXT NOT NULL,
            was_correct INTEGER NOT NULL,
            num1 INTEGER NOT NULL,
            num2 INTEGER NOT NULL,
            answer INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_problem_results_ts ON problem_results (timestamp);
        CREATE TABLE IF NOT EXISTS user_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS archived_problems (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER UNIQUE NOT NULL,
            payload TEXT NOT NULL,
            archived_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS served_problems (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            seed INTEGER UNIQUE NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS dismissed_recommendations (
            id TEXT PRIMARY KEY,
            dismissed_at INTEGER NOT NULL
        );
        ",
    )?;

    let count: i64 = conn.query_row("SELECT count(*) FROM user_state", [], |row| row.get(0))?;
    if count == 0 {
        debug!("[DB] init_db: user_state empty. Seeding defaults...");
        seed_defaults(conn)?;
    }

    Ok(())
}

fn seed_defaults(conn: &Connection) -> Result<()> {
    let settings: DifficultySettings = DifficultyLevel::Novice.settings();
    repository::save_difficulty_settings(conn, &settings)?;
    repository::set_streak(conn, 0)?;
    repository::set_highest_streak(conn, 0)?;
    repository::set_consecutive_wrong(conn, 0)?;
    repository::set_suggest_difficulty_enabled(conn, true)?;
    Ok(())
}
