// src/constants.rs

// --- Time Constants ---
pub const DAY_MILLIS: i64 = 86_400_000;
pub const RECENT_WINDOW_DAYS: i64 = 7;

// --- Progression ---
pub const STREAK_CAP: f64 = 100.0;
pub const MIN_WINDOW_FRACTION: f64 = 0.4; // At max streak, window is 40% of total range
pub const MIN_WINDOW_SIZE: i32 = 3; // Never shrink below this many values

// --- Operation Weights ---
pub const WEIGHT_ADDITION: f64 = 10.0;
pub const WEIGHT_SUBTRACTION: f64 = 10.0;
pub const WEIGHT_HARD_OP_BASE: f64 = 1.0;
pub const WEIGHT_RAMP: f64 = 14.0; // How fast × and ÷ become common

// --- Operand Bounds ---
pub const MIN_OPERAND: i32 = 1;
pub const MIN_DIVISOR: i32 = 2; // Avoid trivial ÷1 problems
pub const MIN_QUOTIENT: i32 = 2; // Avoid trivial answers of 1
pub const PRACTICAL_MAX_DIVISOR: i32 = 12; // Mentally-solvable divisors
pub const DIVISION_ATTEMPTS: usize = 50;
pub const FALLBACK_DIVISOR_END: i32 = 5; // Exclusive
pub const FALLBACK_QUOTIENT_END: i32 = 10; // Exclusive

// --- Difficulty Score ---
pub const MAGNITUDE_LOG_FACTOR: f64 = 3.0;
pub const SPREAD_DIVISOR: f64 = 50.0;
pub const BONUS_ADDITION: f64 = 0.0;
pub const BONUS_SUBTRACTION: f64 = 0.3;
pub const BONUS_MULTIPLICATION: f64 = 1.8;
pub const BONUS_DIVISION: f64 = 2.1;
pub const DIFFICULTY_MIN: u8 = 1;
pub const DIFFICULTY_MAX: u8 = 10;

// --- Distractors ---
pub const NEAR_DISTRACTOR_MAX: i64 = 5;
pub const MAX_DISTRACTOR_DISTANCE_FACTOR: i64 = 3;
pub const MAX_DISTRACTOR_DISTANCE_MIN: i64 = 3;
pub const MAX_DISTRACTOR_DISTANCE_CAP: i64 = 25;

// --- Stable Id ---
pub const ID_HASH_SEED: i64 = 1_125_899_906_842_597; // Large prime
pub const ID_HASH_MULTIPLIER: i64 = 31;

// --- Analytics ---
pub const MIN_ATTEMPTS_FOR_INSIGHT: usize = 10;
pub const MIN_ATTEMPTS_PER_RANGE: usize = MIN_ATTEMPTS_FOR_INSIGHT / 2;
pub const WEAK_ACCURACY_THRESHOLD: f64 = 0.7;
pub const SIGNIFICANT_DROP_THRESHOLD: f64 = 0.25;
pub const NUMBER_RANGES: [(i32, i32); 3] = [(0, 20), (21, 100), (101, i32::MAX)];

// --- Storage Caps ---
pub const MAX_PROGRESS_ENTRIES: usize = 500;
pub const MAX_ARCHIVE_SIZE: usize = 7;
pub const MAX_PENDING_PROBLEMS: usize = 50; // shown but not yet answered

// --- Session ---
pub const SUGGEST_LOWER_AFTER_WRONG: u32 = 3;
pub const DAILY_SEED_DAY_FACTOR: i64 = 1000;
