// src/main.rs

use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;

use math_hero::config::AppConfig;
use math_hero::database;
use math_hero::models::{DifficultyLevel, DifficultySettings, Operation, ProgressReport, Rank};
use math_hero::pedagogy::{self, AnswerOutcome, ProblemKind, ServedProblem};
use math_hero::repository;
use math_hero::templates::ExplanationCatalog;
use math_hero::{AppError, ProblemGenerator};

#[derive(Parser)]
#[command(name = "math-hero", version, about = "One arithmetic problem a day, and as many bonus rounds as you like")]
struct Cli {
    /// Path to the SQLite database file (default: ~/.math-hero.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's problem
    Daily,
    /// Today's problem, or a bonus one if it's already answered
    Next,
    /// A fresh random problem
    Bonus,
    /// Answer a problem shown by daily, next or bonus
    Answer {
        #[arg(long, allow_hyphen_values = true)]
        seed: i64,
        #[arg(long)]
        choice: String,
    },
    /// Accuracy, activity and recommendations
    Report,
    /// Hide a recommendation until new answers come in
    Dismiss {
        #[arg(long)]
        id: String,
    },
    /// Show or change the difficulty
    Difficulty {
        /// Preset: novice, apprentice, adept, expert or master
        #[arg(long, conflicts_with_all = ["ops", "max"])]
        level: Option<String>,
        /// Comma-separated operations, e.g. +,-,x
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, requires = "max")]
        ops: Vec<String>,
        #[arg(long, allow_hyphen_values = true)]
        max: Option<i32>,
        /// Stop suggesting easier presets after repeated misses
        #[arg(long)]
        no_suggestions: bool,
    },
    /// List ranks and the streak each needs
    Ranks,
    /// Recently answered problems
    Archive,
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".math-hero.db")
}

fn build_generator(config: &AppConfig) -> Result<ProblemGenerator, AppError> {
    let catalog = match &config.templates_path {
        Some(path) => ExplanationCatalog::load(path)?,
        None => ExplanationCatalog::bundled()?,
    };
    Ok(ProblemGenerator::new(config.generator.clone(), catalog))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_db_path);
    info!("Database path: {:?}", db_path);

    let conn = Connection::open(&db_path)?;
    database::init_db(&conn)?;
    let generator = build_generator(&config)?;

    let today = Local::now().date_naive();
    let now = Utc::now().timestamp_millis();

    match cli.command {
        Command::Daily => {
            let served = pedagogy::get_daily_problem(&conn, &generator, today)?;
            emit(cli.json, &served, print_problem)?;
        }
        Command::Next => {
            let served = pedagogy::next_problem(&conn, &generator, today)?;
            emit(cli.json, &served, print_problem)?;
        }
        Command::Bonus => {
            let served = pedagogy::get_bonus_problem(&conn, &generator)?;
            emit(cli.json, &served, print_problem)?;
        }
        Command::Answer { seed, choice } => {
            let outcome = pedagogy::answer_served(&conn, &config, seed, &choice, now)?;
            emit(cli.json, &outcome, print_outcome)?;
        }
        Command::Report => {
            let report = pedagogy::progress_report(&conn, now)?;
            emit(cli.json, &report, print_report)?;
        }
        Command::Dismiss { id } => {
            pedagogy::dismiss_recommendation(&conn, &id, now)?;
            if !cli.json {
                println!("Dismissed {}", id);
            }
        }
        Command::Difficulty { level, ops, max, no_suggestions } => {
            if let Some(name) = level {
                let level: DifficultyLevel = name.parse()?;
                pedagogy::set_difficulty(&conn, &level.settings())?;
            } else if let Some(max) = max {
                let ops = ops
                    .iter()
                    .map(|s| s.parse::<Operation>())
                    .collect::<Result<Vec<_>, _>>()?;
                pedagogy::set_difficulty(&conn, &DifficultySettings::new(ops, max))?;
            }
            if no_suggestions {
                pedagogy::disable_difficulty_suggestions(&conn)?;
            }
            let settings = repository::get_difficulty_settings(&conn)?;
            emit(cli.json, &settings, |s| {
                println!("Difficulty: {}", DifficultyLevel::describe(s));
            })?;
        }
        Command::Ranks => {
            let highest = repository::get_highest_streak(&conn)?;
            emit(cli.json, &Rank::all(), |ranks| {
                let current = Rank::for_streak(highest);
                for rank in ranks.iter() {
                    let marker = if rank.level == current.level { ">" } else { " " };
                    println!("{} {:>2}. {:<12} streak {}", marker, rank.level, rank.name, rank.required_streak);
                }
            })?;
        }
        Command::Archive => {
            let archived = repository::get_archived_problems(&conn)?;
            emit(cli.json, &archived, |problems| {
                if problems.is_empty() {
                    println!("No answered problems yet.");
                }
                for p in problems {
                    println!("{}  answer {}", p.question, p.answer);
                }
            })?;
        }
    }
    Ok(())
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn print_problem(served: &ServedProblem) {
    let p = &served.problem;
    let mut choices = p.choices().map(|c| c.parse::<i64>().unwrap_or_default());
    choices.sort_unstable();
    let label = match served.kind {
        ProblemKind::Daily => "Daily problem",
        ProblemKind::Bonus => "Bonus problem",
    };
    println!("{} (difficulty {}/10)", label, p.difficulty);
    println!();
    println!("    {}", p.question);
    println!();
    println!("Choices: {}  {}  {}", choices[0], choices[1], choices[2]);
    println!("Answer with: math-hero answer --seed {} --choice <value>", served.seed);
}

fn print_outcome(outcome: &AnswerOutcome) {
    if outcome.was_correct {
        println!("Correct! Streak: {}", outcome.streak);
    } else {
        println!("Not quite. The answer was {}.", outcome.correct_answer);
    }
    if let Some(explanation) = &outcome.explanation {
        println!("{}", explanation);
    }
    if outcome.ranked_up {
        println!("Rank up! You are now a {}.", outcome.rank.name);
    }
    if outcome.suggest_lower_difficulty {
        println!("Tough run. Try `math-hero difficulty --level novice` for a while.");
    }
}

fn print_report(report: &ProgressReport) {
    println!("Total solved:      {}", report.total_problems_solved);
    println!("Last 7 days:       {}", report.problems_solved_last_7_days);
    println!("Per day:           {:.1}", report.average_problems_per_day);
    println!("Longest streak:    {}", report.longest_streak);
    println!();
    for (op, (correct, total)) in &report.accuracy_by_operation {
        let pct = if *total > 0 { *correct as f64 * 100.0 / *total as f64 } else { 0.0 };
        println!("{:<15} {:>3}/{:<3} {:>5.1}%", op.display_name(), correct, total, pct);
    }
    for rec in &report.recommendations {
        println!();
        println!("[{}] {}", rec.id, rec.title);
        println!("  {}", rec.description);
        println!("  {}", rec.detail_description);
    }
}
