// src/models.rs

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// --- Operations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Addition = 0,
    Subtraction = 1,
    Multiplication = 2,
    Division = 3,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
    ];

    pub fn ordinal(&self) -> i64 {
        *self as i64
    }

    /// Upper-case name used in persistence and recommendation ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "ADDITION",
            Operation::Subtraction => "SUBTRACTION",
            Operation::Multiplication => "MULTIPLICATION",
            Operation::Division => "DIVISION",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Addition => "+",
            Operation::Subtraction => "-",
            Operation::Multiplication => "×",
            Operation::Division => "÷",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Operation::Addition => "Addition",
            Operation::Subtraction => "Subtraction",
            Operation::Multiplication => "Multiplication",
            Operation::Division => "Division",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operation> {
        Operation::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADDITION" | "ADD" | "+" => Ok(Operation::Addition),
            "SUBTRACTION" | "SUB" | "-" => Ok(Operation::Subtraction),
            "MULTIPLICATION" | "MUL" | "*" | "X" | "×" => Ok(Operation::Multiplication),
            "DIVISION" | "DIV" | "/" | "÷" => Ok(Operation::Division),
            _ => Err(AppError::UnknownOperation(s.to_string())),
        }
    }
}

// --- Difficulty ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultySettings {
    pub operations: BTreeSet<Operation>,
    pub max_number: i32,
}

impl DifficultySettings {
    pub fn new(operations: impl IntoIterator<Item = Operation>, max_number: i32) -> Self {
        DifficultySettings {
            operations: operations.into_iter().collect(),
            max_number,
        }
    }
}

impl Default for DifficultySettings {
    fn default() -> Self {
        DifficultyLevel::Novice.settings()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyLevel {
    Novice,
    Apprentice,
    Adept,
    Expert,
    Master,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 5] = [
        DifficultyLevel::Novice,
        DifficultyLevel::Apprentice,
        DifficultyLevel::Adept,
        DifficultyLevel::Expert,
        DifficultyLevel::Master,
    ];

    pub fn settings(&self) -> DifficultySettings {
        use Operation::*;
        match self {
            DifficultyLevel::Novice => DifficultySettings::new([Addition], 10),
            DifficultyLevel::Apprentice => DifficultySettings::new([Addition, Subtraction], 20),
            DifficultyLevel::Adept => DifficultySettings::new([Addition, Subtraction], 50),
            // Smaller numbers once multiplication is in play
            DifficultyLevel::Expert => {
                DifficultySettings::new([Addition, Subtraction, Multiplication], 20)
            }
            DifficultyLevel::Master => DifficultySettings::new(Operation::ALL, 200),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DifficultyLevel::Novice => "Novice",
            DifficultyLevel::Apprentice => "Apprentice",
            DifficultyLevel::Adept => "Adept",
            DifficultyLevel::Expert => "Expert",
            DifficultyLevel::Master => "Master",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DifficultyLevel::Novice => "Addition with numbers up to 10.",
            DifficultyLevel::Apprentice => "Addition and subtraction up to 20.",
            DifficultyLevel::Adept => "Addition and subtraction up to 50.",
            DifficultyLevel::Expert => "Adds multiplication, numbers up to 20.",
            DifficultyLevel::Master => "All four operations with numbers up to 200.",
        }
    }

    pub fn matching(settings: &DifficultySettings) -> Option<DifficultyLevel> {
        DifficultyLevel::ALL
            .into_iter()
            .find(|level| level.settings() == *settings)
    }

    /// Preset title, or a custom summary such as "Custom (+, × up to 30)".
    pub fn describe(settings: &DifficultySettings) -> String {
        if let Some(level) = DifficultyLevel::matching(settings) {
            return level.title().to_string();
        }
        let ops = settings
            .operations
            .iter()
            .map(|op| op.symbol())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Custom ({} up to {})", ops, settings.max_number)
    }
}

impl FromStr for DifficultyLevel {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DifficultyLevel::ALL
            .into_iter()
            .find(|level| level.title().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownDifficulty(s.to_string()))
    }
}

// --- Problems ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: u32,
    pub question: String,
    pub answer: String,
    pub distractor1: String,
    pub distractor2: String,
    pub difficulty: u8,
    pub explanation: Option<String>,
    pub num1: i32,
    pub num2: i32,
    pub operator: String,
}

impl Problem {
    pub fn operation(&self) -> Option<Operation> {
        Operation::from_symbol(&self.operator)
    }

    /// All three choices in a fixed order: answer first, then distractors.
    pub fn choices(&self) -> [&str; 3] {
        [&self.answer, &self.distractor1, &self.distractor2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    Daily,
    Bonus,
}

/// A problem as it was shown, with the seed the user answers it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServedProblem {
    pub kind: ProblemKind,
    pub seed: i64,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemResult {
    pub timestamp: i64, // Epoch millis
    pub operation: Operation,
    pub was_correct: bool,
    pub num1: i32,
    pub num2: i32,
    pub answer: i64,
}

impl ProblemResult {
    pub fn max_operand(&self) -> i32 {
        self.num1.max(self.num2)
    }
}

// --- Progress ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationIcon {
    Insight,
    CheckCircle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub icon: RecommendationIcon,
    pub title: String,
    pub description: String,
    pub detail_title: String,
    pub detail_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub accuracy_by_operation: BTreeMap<Operation, (u32, u32)>, // (correct, total)
    pub problems_solved_last_7_days: u32,
    pub total_problems_solved: u32,
    pub longest_streak: u32,
    pub average_problems_per_day: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Recommendation id -> epoch millis of its latest dismissal.
pub type DismissalLog = BTreeMap<String, i64>;

// --- Ranks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rank {
    pub level: u32,
    pub name: &'static str,
    pub required_streak: u32,
}

pub const RANKS: [Rank; 10] = [
    Rank { level: 1, name: "Novice", required_streak: 0 },
    Rank { level: 2, name: "Apprentice", required_streak: 10 },
    Rank { level: 3, name: "Adept", required_streak: 25 },
    Rank { level: 4, name: "Specialist", required_streak: 50 },
    Rank { level: 5, name: "Expert", required_streak: 75 },
    Rank { level: 6, name: "Master", required_streak: 100 },
    Rank { level: 7, name: "Grandmaster", required_streak: 150 },
    Rank { level: 8, name: "Legend", required_streak: 200 },
    Rank { level: 9, name: "Mythic", required_streak: 300 },
    Rank { level: 10, name: "Titan", required_streak: 500 },
];

impl Rank {
    pub fn all() -> &'static [Rank] {
        &RANKS
    }

    pub fn for_streak(streak: u32) -> Rank {
        RANKS
            .iter()
            .rev()
            .find(|r| streak >= r.required_streak)
            .copied()
            .unwrap_or(RANKS[0])
    }

    pub fn next(&self) -> Option<Rank> {
        RANKS.iter().find(|r| r.level == self.level + 1).copied()
    }
}
