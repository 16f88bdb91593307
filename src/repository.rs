// src/repository.rs

use crate::error::AppError;
use crate::models::{DifficultySettings, DismissalLog, Operation, Problem, ProblemResult, ServedProblem};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::str::FromStr;

const KEY_STREAK: &str = "streak_count";
const KEY_HIGHEST_STREAK: &str = "highest_streak_count";
const KEY_CONSECUTIVE_WRONG: &str = "consecutive_wrong_answers";
const KEY_DIFFICULTY_OPS: &str = "difficulty_operations";
const KEY_DIFFICULTY_MAX: &str = "difficulty_max_number";
const KEY_SUGGEST_DIFFICULTY: &str = "suggest_difficulty_enabled";
const KEY_LAST_DAILY_SEED: &str = "last_daily_seed";

// --- Key/Value State ---

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM user_state WHERE key = ?", [key], |row| {
        row.get(0)
    })
    .optional()
}

fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_state (key, value) VALUES (?, ?)",
        params![key, value],
    )?;
    Ok(())
}

/// Missing or unparsable counters read as 0.
fn get_counter(conn: &Connection, key: &str) -> Result<u32> {
    Ok(get_value(conn, key)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

pub fn get_streak(conn: &Connection) -> Result<u32> {
    get_counter(conn, KEY_STREAK)
}

pub fn set_streak(conn: &Connection, streak: u32) -> Result<()> {
    set_value(conn, KEY_STREAK, &streak.to_string())
}

pub fn get_highest_streak(conn: &Connection) -> Result<u32> {
    get_counter(conn, KEY_HIGHEST_STREAK)
}

pub fn set_highest_streak(conn: &Connection, streak: u32) -> Result<()> {
    set_value(conn, KEY_HIGHEST_STREAK, &streak.to_string())
}

pub fn get_consecutive_wrong(conn: &Connection) -> Result<u32> {
    get_counter(conn, KEY_CONSECUTIVE_WRONG)
}

pub fn set_consecutive_wrong(conn: &Connection, count: u32) -> Result<()> {
    set_value(conn, KEY_CONSECUTIVE_WRONG, &count.to_string())
}

pub fn is_suggest_difficulty_enabled(conn: &Connection) -> Result<bool> {
    Ok(get_value(conn, KEY_SUGGEST_DIFFICULTY)?.map_or(true, |v| v != "false"))
}

pub fn set_suggest_difficulty_enabled(conn: &Connection, enabled: bool) -> Result<()> {
    set_value(conn, KEY_SUGGEST_DIFFICULTY, if enabled { "true" } else { "false" })
}

pub fn get_last_daily_seed(conn: &Connection) -> Result<Option<i64>> {
    Ok(get_value(conn, KEY_LAST_DAILY_SEED)?.and_then(|v| v.parse().ok()))
}

pub fn set_last_daily_seed(conn: &Connection, seed: i64) -> Result<()> {
    set_value(conn, KEY_LAST_DAILY_SEED, &seed.to_string())
}

/// Stored operation names that no longer parse are skipped.
pub fn get_difficulty_settings(conn: &Connection) -> Result<DifficultySettings> {
    let defaults = DifficultySettings::default();
    let ops = match get_value(conn, KEY_DIFFICULTY_OPS)? {
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.is_empty())
            .filter_map(|name| match Operation::from_str(name) {
                Ok(op) => Some(op),
                Err(_) => {
                    warn!("[DB] Skipping unknown stored operation {:?}", name);
                    None
                }
            })
            .collect(),
        None => defaults.operations,
    };
    let max_number = get_value(conn, KEY_DIFFICULTY_MAX)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_number);
    Ok(DifficultySettings { operations: ops, max_number })
}

pub fn save_difficulty_settings(conn: &Connection, settings: &DifficultySettings) -> Result<()> {
    let ops = settings
        .operations
        .iter()
        .map(|op| op.as_str())
        .collect::<Vec<_>>()
        .join(",");
    set_value(conn, KEY_DIFFICULTY_OPS, &ops)?;
    set_value(conn, KEY_DIFFICULTY_MAX, &settings.max_number.to_string())
}

// --- Answer History ---

/// Records a result and drops everything but the newest `max_entries`.
pub fn log_result(conn: &Connection, result: &ProblemResult, max_entries: usize) -> Result<()> {
    conn.execute(
        "INSERT INTO problem_results (timestamp, operation, was_correct, num1, num2, answer) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            result.timestamp,
            result.operation.as_str(),
            result.was_correct,
            result.num1,
            result.num2,
            result.answer
        ],
    )?;

    let pruned = conn.execute(
        "DELETE FROM problem_results WHERE id NOT IN (
            SELECT id FROM problem_results ORDER BY timestamp DESC, id DESC LIMIT ?
         )",
        [max_entries as i64],
    )?;
    if pruned > 0 {
        debug!("[DB] Pruned {} old results", pruned);
    }
    Ok(())
}

/// Oldest first.
pub fn get_history(conn: &Connection) -> Result<Vec<ProblemResult>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, operation, was_correct, num1, num2, answer
         FROM problem_results
         ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, bool>(2)?,
            row.get::<_, i32>(3)?,
            row.get::<_, i32>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (timestamp, op_name, was_correct, num1, num2, answer) = row?;
        match Operation::from_str(&op_name) {
            Ok(operation) => history.push(ProblemResult {
                timestamp,
                operation,
                was_correct,
                num1,
                num2,
                answer,
            }),
            Err(_) => warn!("[DB] Skipping result with unknown operation {:?}", op_name),
        }
    }
    Ok(history)
}

pub fn get_result_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT count(*) FROM problem_results", [], |r| r.get(0))
}

// --- Archive ---

/// Moves `problem` to the front of the archive and keeps the newest `cap`.
pub fn archive_problem(
    conn: &Connection,
    problem: &Problem,
    now: i64,
    cap: usize,
) -> std::result::Result<(), AppError> {
    let payload = serde_json::to_string(problem)?;
    conn.execute("DELETE FROM archived_problems WHERE id = ?", [problem.id])?;
    conn.execute(
        "INSERT INTO archived_problems (id, payload, archived_at) VALUES (?, ?, ?)",
        params![problem.id, payload, now],
    )?;
    conn.execute(
        "DELETE FROM archived_problems WHERE seq NOT IN (
            SELECT seq FROM archived_problems ORDER BY seq DESC LIMIT ?
         )",
        [cap as i64],
    )?;
    Ok(())
}

/// Newest first.
pub fn get_archived_problems(conn: &Connection) -> std::result::Result<Vec<Problem>, AppError> {
    let mut stmt = conn.prepare("SELECT payload FROM archived_problems ORDER BY seq DESC")?;
    let payloads = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>>>()?;

    let mut problems = Vec::with_capacity(payloads.len());
    for payload in payloads {
        problems.push(serde_json::from_str(&payload)?);
    }
    Ok(problems)
}

pub fn is_archived(conn: &Connection, problem_id: u32) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM archived_problems WHERE id = ?",
        [problem_id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

// --- Served Problems ---

/// Remembers what was shown for `served.seed` until it is answered.
/// Serving the same seed again replaces the earlier copy.
pub fn save_served_problem(
    conn: &Connection,
    served: &ServedProblem,
    cap: usize,
) -> std::result::Result<(), AppError> {
    let payload = serde_json::to_string(served)?;
    conn.execute("DELETE FROM served_problems WHERE seed = ?", [served.seed])?;
    conn.execute(
        "INSERT INTO served_problems (seed, payload) VALUES (?, ?)",
        params![served.seed, payload],
    )?;
    conn.execute(
        "DELETE FROM served_problems WHERE seq NOT IN (
            SELECT seq FROM served_problems ORDER BY seq DESC LIMIT ?
         )",
        [cap as i64],
    )?;
    Ok(())
}

pub fn get_served_problem(
    conn: &Connection,
    seed: i64,
) -> std::result::Result<Option<ServedProblem>, AppError> {
    let payload: Option<String> = conn
        .query_row("SELECT payload FROM served_problems WHERE seed = ?", [seed], |r| r.get(0))
        .optional()?;
    match payload {
        Some(p) => Ok(Some(serde_json::from_str(&p)?)),
        None => Ok(None),
    }
}

pub fn forget_served_problem(conn: &Connection, seed: i64) -> Result<()> {
    conn.execute("DELETE FROM served_problems WHERE seed = ?", [seed])?;
    Ok(())
}

// --- Dismissals ---

pub fn dismiss_recommendation(conn: &Connection, id: &str, now: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO dismissed_recommendations (id, dismissed_at) VALUES (?, ?)",
        params![id, now],
    )?;
    Ok(())
}

pub fn get_dismissals(conn: &Connection) -> Result<DismissalLog> {
    let mut stmt = conn.prepare("SELECT id, dismissed_at FROM dismissed_recommendations")?;
    let log = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<DismissalLog>>()?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_db;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    fn result(ts: i64) -> ProblemResult {
        ProblemResult {
            timestamp: ts,
            operation: Operation::Addition,
            was_correct: true,
            num1: 2,
            num2: 3,
            answer: 5,
        }
    }

    #[test]
    fn history_is_pruned_to_newest() {
        let conn = conn();
        for ts in 0..12 {
            log_result(&conn, &result(ts), 10).unwrap();
        }
        let history = get_history(&conn).unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history.first().unwrap().timestamp, 2);
        assert_eq!(history.last().unwrap().timestamp, 11);
    }

    #[test]
    fn unknown_operations_are_skipped() {
        let conn = conn();
        log_result(&conn, &result(1), 10).unwrap();
        conn.execute(
            "INSERT INTO problem_results (timestamp, operation, was_correct, num1, num2, answer) VALUES (2, 'MODULO', 1, 1, 1, 0)",
            [],
        )
        .unwrap();
        assert_eq!(get_result_count(&conn).unwrap(), 2);
        assert_eq!(get_history(&conn).unwrap().len(), 1);

        set_value(&conn, KEY_DIFFICULTY_OPS, "ADDITION,MODULO,DIVISION").unwrap();
        let settings = get_difficulty_settings(&conn).unwrap();
        assert_eq!(
            settings.operations.into_iter().collect::<Vec<_>>(),
            vec![Operation::Addition, Operation::Division]
        );
    }

    #[test]
    fn settings_round_trip() {
        let conn = conn();
        let settings = DifficultySettings::new([Operation::Subtraction, Operation::Multiplication], 33);
        save_difficulty_settings(&conn, &settings).unwrap();
        assert_eq!(get_difficulty_settings(&conn).unwrap(), settings);
    }

    #[test]
    fn served_problems_are_replaced_by_seed_and_capped() {
        let conn = conn();
        let g = crate::ProblemGenerator::with_defaults().unwrap();
        let settings = DifficultySettings::new([Operation::Addition], 50);
        let served = |seed: i64, streak: u32| ServedProblem {
            kind: crate::models::ProblemKind::Bonus,
            seed,
            problem: g.generate(&settings, streak, seed),
        };

        save_served_problem(&conn, &served(1, 0), 3).unwrap();
        save_served_problem(&conn, &served(1, 90), 3).unwrap();
        assert_eq!(get_served_problem(&conn, 1).unwrap(), Some(served(1, 90)));

        for seed in 2..5 {
            save_served_problem(&conn, &served(seed, 0), 3).unwrap();
        }
        assert_eq!(get_served_problem(&conn, 1).unwrap(), None);
        assert!(get_served_problem(&conn, 4).unwrap().is_some());

        forget_served_problem(&conn, 4).unwrap();
        assert_eq!(get_served_problem(&conn, 4).unwrap(), None);
    }

    #[test]
    fn dismissals_keep_latest_timestamp() {
        let conn = conn();
        dismiss_recommendation(&conn, "all_good", 10).unwrap();
        dismiss_recommendation(&conn, "all_good", 20).unwrap();
        dismiss_recommendation(&conn, "more_data", 5).unwrap();
        let log = get_dismissals(&conn).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log["all_good"], 20);
    }
}
