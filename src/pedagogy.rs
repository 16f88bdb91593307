// src/pedagogy.rs
//
// Session flow on top of the generator: which problem to serve today, and
// what an answer does to streaks, history and the archive.

use crate::analytics;
use crate::config::AppConfig;
use crate::constants::*;
use crate::error::AppError;
use crate::generator::ProblemGenerator;
use crate::config::GeneratorConfig;
use crate::models::{DifficultyLevel, DifficultySettings, Problem, ProblemResult, ProgressReport, Rank};
use crate::repository;
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use rusqlite::Connection;
use serde::Serialize;

pub use crate::models::{ProblemKind, ServedProblem};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub was_correct: bool,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub streak: u32,
    pub highest_streak: u32,
    pub rank: Rank,
    pub ranked_up: bool,
    /// Too many misses in a row: offer an easier preset.
    pub suggest_lower_difficulty: bool,
}

// --- Seeds ---

/// Same seed all day, different every day of the year.
pub fn daily_seed(date: NaiveDate) -> i64 {
    date.ordinal() as i64 * DAILY_SEED_DAY_FACTOR + date.year() as i64
}

pub fn bonus_seed() -> i64 {
    rand::random()
}

// --- Serving ---

pub fn get_daily_problem(
    conn: &Connection,
    generator: &ProblemGenerator,
    today: NaiveDate,
) -> Result<ServedProblem, AppError> {
    problem_for_seed(conn, generator, ProblemKind::Daily, daily_seed(today))
}

pub fn get_bonus_problem(
    conn: &Connection,
    generator: &ProblemGenerator,
) -> Result<ServedProblem, AppError> {
    problem_for_seed(conn, generator, ProblemKind::Bonus, bonus_seed())
}

/// Today's problem, or a bonus once today's has been answered.
pub fn next_problem(
    conn: &Connection,
    generator: &ProblemGenerator,
    today: NaiveDate,
) -> Result<ServedProblem, AppError> {
    let daily = get_daily_problem(conn, generator, today)?;
    // The daily operands follow the streak, so the seed is what identifies it.
    let answered = repository::get_last_daily_seed(conn)? == Some(daily.seed)
        || repository::is_archived(conn, daily.problem.id)?;
    if answered {
        debug!("Daily problem for seed {} already answered", daily.seed);
        return get_bonus_problem(conn, generator);
    }
    Ok(daily)
}

/// Generates the problem for `seed` from the stored settings and streak,
/// and keeps it so the answer is checked against what was shown.
pub fn problem_for_seed(
    conn: &Connection,
    generator: &ProblemGenerator,
    kind: ProblemKind,
    seed: i64,
) -> Result<ServedProblem, AppError> {
    let settings = repository::get_difficulty_settings(conn)?;
    let streak = repository::get_streak(conn)?;
    warn_if_corrected(generator.config(), &settings);

    let problem = generator.generate(&settings, streak, seed);
    info!(
        "Serving {:?} problem {} (ID: {}, seed: {}, difficulty: {})",
        kind, problem.question, problem.id, seed, problem.difficulty
    );
    let served = ServedProblem { kind, seed, problem };
    repository::save_served_problem(conn, &served, MAX_PENDING_PROBLEMS)?;
    Ok(served)
}

/// The problem last shown under `seed`, exactly as it was shown.
pub fn served_problem(conn: &Connection, seed: i64) -> Result<ServedProblem, AppError> {
    repository::get_served_problem(conn, seed)?.ok_or(AppError::NotServed(seed))
}

/// Unpersisted practice round with caller-chosen settings.
pub fn kid_mode_problem(
    generator: &ProblemGenerator,
    settings: &DifficultySettings,
    session_streak: u32,
) -> ServedProblem {
    warn_if_corrected(generator.config(), settings);
    let seed = bonus_seed();
    ServedProblem {
        kind: ProblemKind::Bonus,
        seed,
        problem: generator.generate(settings, session_streak, seed),
    }
}

fn warn_if_corrected(config: &GeneratorConfig, settings: &DifficultySettings) {
    if settings.operations.is_empty() {
        warn!("No operations selected. Using addition instead.");
    }
    for op in &settings.operations {
        let effective = config.effective_max(settings, *op);
        if effective != settings.max_number {
            warn!(
                "Invalid max number {} for {}. Using {} instead.",
                settings.max_number, op, effective
            );
        }
    }
}

// --- Answers ---

/// Answers the problem shown under `seed`.
pub fn answer_served(
    conn: &Connection,
    config: &AppConfig,
    seed: i64,
    chosen: &str,
    now: i64,
) -> Result<AnswerOutcome, AppError> {
    let served = served_problem(conn, seed)?;
    process_answer(conn, config, &served, chosen, now)
}

/// Grades `chosen` and applies it to the archive, history and streak in one
/// transaction. A daily problem counts once.
pub fn process_answer(
    conn: &Connection,
    config: &AppConfig,
    served: &ServedProblem,
    chosen: &str,
    now: i64,
) -> Result<AnswerOutcome, AppError> {
    let problem = &served.problem;
    let was_correct = chosen.trim() == problem.answer;
    let result = to_result(problem, was_correct, now)?;

    let tx = conn.unchecked_transaction()?;
    if served.kind == ProblemKind::Daily && repository::get_last_daily_seed(&tx)? == Some(served.seed) {
        warn!("Daily problem for seed {} was already answered", served.seed);
        return Err(AppError::AlreadyAnswered(served.seed));
    }
    info!(
        "Processing answer {:?} for problem {} (ID: {}): {}",
        chosen,
        problem.question,
        problem.id,
        if was_correct { "correct" } else { "wrong" }
    );

    repository::archive_problem(&tx, problem, now, config.archive_size)?;
    repository::log_result(&tx, &result, config.max_history)?;
    repository::forget_served_problem(&tx, served.seed)?;
    if served.kind == ProblemKind::Daily {
        repository::set_last_daily_seed(&tx, served.seed)?;
    }

    let old_highest = repository::get_highest_streak(&tx)?;
    let old_rank = Rank::for_streak(old_highest);

    let (streak, suggest_lower_difficulty) = if was_correct {
        let streak = repository::get_streak(&tx)?.saturating_add(1);
        repository::set_streak(&tx, streak)?;
        repository::set_consecutive_wrong(&tx, 0)?;
        (streak, false)
    } else {
        repository::set_streak(&tx, 0)?;
        let wrong = repository::get_consecutive_wrong(&tx)?.saturating_add(1);
        repository::set_consecutive_wrong(&tx, wrong)?;
        (0, should_suggest_lower_difficulty(&tx, wrong)?)
    };

    let highest_streak = old_highest.max(streak);
    if highest_streak > old_highest {
        repository::set_highest_streak(&tx, highest_streak)?;
    }
    tx.commit()?;

    let rank = Rank::for_streak(highest_streak);
    let ranked_up = rank.level > old_rank.level;

    if ranked_up {
        info!("[Rank] {} -> {} at streak {}", old_rank.name, rank.name, highest_streak);
    }
    if suggest_lower_difficulty {
        warn!("Several wrong answers in a row. Suggesting a lower difficulty.");
    }

    Ok(AnswerOutcome {
        was_correct,
        correct_answer: problem.answer.clone(),
        explanation: problem.explanation.clone(),
        streak,
        highest_streak,
        rank,
        ranked_up,
        suggest_lower_difficulty,
    })
}

/// Kid mode answers still count towards analytics, but leave streaks and
/// the archive alone.
pub fn record_kid_mode_answer(
    conn: &Connection,
    config: &AppConfig,
    problem: &Problem,
    chosen: &str,
    now: i64,
) -> Result<bool, AppError> {
    let was_correct = chosen.trim() == problem.answer;
    repository::log_result(conn, &to_result(problem, was_correct, now)?, config.max_history)?;
    Ok(was_correct)
}

fn should_suggest_lower_difficulty(conn: &Connection, wrong: u32) -> Result<bool, AppError> {
    if wrong < SUGGEST_LOWER_AFTER_WRONG || !repository::is_suggest_difficulty_enabled(conn)? {
        return Ok(false);
    }
    let settings = repository::get_difficulty_settings(conn)?;
    Ok(settings != DifficultyLevel::Novice.settings())
}

fn to_result(problem: &Problem, was_correct: bool, now: i64) -> Result<ProblemResult, AppError> {
    let operation = problem
        .operation()
        .ok_or_else(|| AppError::InvalidProblem(format!("unknown operator {:?}", problem.operator)))?;
    let answer = problem
        .answer
        .parse()
        .map_err(|_| AppError::InvalidProblem(format!("non-numeric answer {:?}", problem.answer)))?;
    Ok(ProblemResult {
        timestamp: now,
        operation,
        was_correct,
        num1: problem.num1,
        num2: problem.num2,
        answer,
    })
}

// --- Progress & Settings ---

pub fn progress_report(conn: &Connection, now: i64) -> Result<ProgressReport, AppError> {
    let history = repository::get_history(conn)?;
    let highest = repository::get_highest_streak(conn)?;
    let dismissals = repository::get_dismissals(conn)?;
    Ok(analytics::analyze_with(&history, highest, &dismissals, now))
}

pub fn dismiss_recommendation(conn: &Connection, id: &str, now: i64) -> Result<(), AppError> {
    info!("Dismissing recommendation {}", id);
    repository::dismiss_recommendation(conn, id, now)?;
    Ok(())
}

pub fn set_difficulty(conn: &Connection, settings: &DifficultySettings) -> Result<(), AppError> {
    info!("Difficulty set to {}", DifficultyLevel::describe(settings));
    repository::save_difficulty_settings(conn, settings)?;
    repository::set_consecutive_wrong(conn, 0)?;
    Ok(())
}

pub fn disable_difficulty_suggestions(conn: &Connection) -> Result<(), AppError> {
    repository::set_suggest_difficulty_enabled(conn, false)?;
    Ok(())
}
