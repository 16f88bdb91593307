// src/generator.rs
//
// Deterministic, progressive problem generation.
//
// Every random choice comes from one ChaCha8 stream seeded once per call,
// drawn in this order:
//   1. operation: shuffle of the weighted entries, then one f64 (only with 2+ ops)
//   2. operands: per-operation gen_range draws; division also picks a divisor
//   3. distractors: near magnitude, near sign, far magnitude, far sign
//   4. explanation template pick
// Reordering any of these changes every generated problem for a given seed.

use crate::config::GeneratorConfig;
use crate::constants::*;
use crate::error::AppError;
use crate::models::{DifficultySettings, Operation, Problem};
use crate::templates::{render, ExplanationCatalog, TemplateArgs, DEFAULT_EXPLANATION};
use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

/// Operands and result before scoring and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Draw {
    num1: i32,
    num2: i32,
    answer: i64,
}

#[derive(Debug, Clone)]
pub struct ProblemGenerator {
    config: GeneratorConfig,
    catalog: ExplanationCatalog,
}

impl ProblemGenerator {
    pub fn new(config: GeneratorConfig, catalog: ExplanationCatalog) -> Self {
        ProblemGenerator { config, catalog }
    }

    /// Default tuning with the bundled explanation templates.
    pub fn with_defaults() -> Result<Self, AppError> {
        Ok(Self::new(GeneratorConfig::default(), ExplanationCatalog::bundled()?))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Same `(settings, streak, seed)` always yields the same problem.
    pub fn generate(&self, settings: &DifficultySettings, streak: u32, seed: i64) -> Problem {
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        let prog = self.config.progress(streak);

        let operation = self.select_operation(&settings.operations, prog, &mut rng);
        let min_number = self.config.min_operand(operation);
        let max_number = self.config.effective_max(settings, operation);
        let (range_start, range_end) = self.progressive_range(min_number, max_number, prog);

        debug!(
            "[Generator] seed={} streak={} op={} window=[{}, {}] of [{}, {}]",
            seed, streak, operation, range_start, range_end, min_number, max_number
        );

        let draw = match operation {
            Operation::Addition => {
                let a = rng.gen_range(range_start..=range_end);
                let b = rng.gen_range(range_start..=range_end);
                Draw { num1: a, num2: b, answer: a as i64 + b as i64 }
            }
            Operation::Subtraction => {
                let a = rng.gen_range(range_start..=range_end);
                let b = rng.gen_range(range_start..=a);
                Draw { num1: a, num2: b, answer: a as i64 - b as i64 }
            }
            Operation::Multiplication => {
                let a = rng.gen_range(range_start..=range_end);
                let b = rng.gen_range(range_start..=range_end);
                Draw { num1: a, num2: b, answer: a as i64 * b as i64 }
            }
            Operation::Division => self.division(range_start, range_end, &mut rng),
        };

        let difficulty = difficulty_score(operation, draw.num1, draw.num2, draw.answer);
        let (d1, d2) = self.distractors(draw.answer, difficulty, &mut rng);
        let args = TemplateArgs { num1: draw.num1, num2: draw.num2, answer: draw.answer };
        let explanation = self.explanation(operation, &args, &mut rng);

        Problem {
            id: stable_id(seed, operation, draw.num1, draw.num2, draw.answer),
            question: format!("{} {} {} = ?", draw.num1, operation.symbol(), draw.num2),
            answer: draw.answer.to_string(),
            distractor1: d1.to_string(),
            distractor2: d2.to_string(),
            difficulty,
            explanation: Some(explanation),
            num1: draw.num1,
            num2: draw.num2,
            operator: operation.symbol().to_string(),
        }
    }

    fn weight(&self, op: Operation, prog: f64) -> f64 {
        match op {
            Operation::Addition => WEIGHT_ADDITION,
            Operation::Subtraction => WEIGHT_SUBTRACTION,
            Operation::Multiplication | Operation::Division => {
                WEIGHT_HARD_OP_BASE + self.config.weight_ramp * prog
            }
        }
    }

    // --- Operation Selection ---

    fn select_operation(
        &self,
        ops: &BTreeSet<Operation>,
        prog: f64,
        rng: &mut ChaCha8Rng,
    ) -> Operation {
        if ops.len() <= 1 {
            return ops.iter().next().copied().unwrap_or(Operation::Addition);
        }

        // Shuffled so ties and float edges don't favour declaration order.
        let mut weighted: Vec<(Operation, f64)> =
            ops.iter().map(|&op| (op, self.weight(op, prog))).collect();
        weighted.shuffle(rng);

        let total: f64 = weighted.iter().map(|&(_, w)| w).sum();
        let mut r = rng.gen::<f64>() * total;
        for &(op, w) in &weighted {
            if r < w {
                return op;
            }
            r -= w;
        }
        weighted
            .last()
            .map(|&(op, _)| op)
            .unwrap_or(Operation::Addition)
    }

    // --- Range Progression ---

    /// Sliding window inside `[min, max]`: shrinks towards
    /// `max(MIN_WINDOW_SIZE, 40%)` of the range and slides right as `prog` grows.
    fn progressive_range(&self, min: i32, max: i32, prog: f64) -> (i32, i32) {
        if min >= max {
            return (min, max);
        }

        let (min, max) = (min as i64, max as i64);
        let total_range = max - min + 1;
        let min_window = (self.config.min_window_size as i64).clamp(1, total_range);
        let target = total_range as f64 * (1.0 - (1.0 - self.config.min_window_fraction) * prog);
        let window = (target.round_ties_even() as i64).clamp(min_window, total_range);

        let max_start = max - window + 1;
        let start = ((min as f64 + (max_start - min) as f64 * prog) as i64).clamp(min, max_start);
        let end = start + window - 1;

        (start as i32, end as i32)
    }

    // --- Division ---

    fn division(&self, start: i32, end: i32, rng: &mut ChaCha8Rng) -> Draw {
        let min_divisor = self.config.min_operand(Operation::Division);
        let max_divisor = self.config.max_divisor.max(min_divisor);
        let min_quotient = self.config.min_quotient;

        for _ in 0..self.config.division_attempts {
            let a = rng.gen_range(start..=end);
            let divisors: Vec<i32> = (min_divisor..=max_divisor)
                .filter(|&b| a % b == 0 && a / b >= min_quotient)
                .collect();
            if let Some(&b) = divisors.choose(rng) {
                return Draw { num1: a, num2: b, answer: (a / b) as i64 };
            }
        }

        // Window full of primes and small numbers: build a small exact problem.
        debug!("[Generator] No divisor found in [{}, {}]; using fallback", start, end);
        let b = rng.gen_range(min_divisor..=(FALLBACK_DIVISOR_END - 1).max(min_divisor));
        let q = rng.gen_range(min_quotient..=(FALLBACK_QUOTIENT_END - 1).max(min_quotient));
        Draw { num1: b * q, num2: b, answer: q as i64 }
    }

    // --- Distractors ---

    fn distractors(&self, answer: i64, difficulty: u8, rng: &mut ChaCha8Rng) -> (i64, i64) {
        let d = difficulty as i64;
        let near = d.clamp(1, NEAR_DISTRACTOR_MAX) as i32;
        let far = (d * self.config.max_distractor_distance_factor)
            .min(self.config.max_distractor_distance_cap)
            .max(MAX_DISTRACTOR_DISTANCE_MIN) as i32;

        // A close distractor, then a farther one.
        let near_off = (1 + rng.gen_range(0..near)) as i64 * random_sign(rng);
        let far_span = (far - near + 1).max(1);
        let mut far_off = (near + rng.gen_range(0..far_span)) as i64 * random_sign(rng);
        if far_off == 0 || far_off == near_off {
            far_off += if far_off >= 0 { 1 } else { -1 };
        }

        let mut picked: Vec<i64> = Vec::with_capacity(2);
        for off in [near_off, far_off] {
            let candidate = answer + off;
            if candidate >= 0 && candidate != answer && !picked.contains(&candidate) {
                picked.push(candidate);
            }
        }

        // Offsets collided or went negative: scan outwards from the answer.
        let mut step = 1;
        while picked.len() < 2 {
            let up = answer + step;
            let down = answer - step;
            if up >= 0 && !picked.contains(&up) {
                picked.push(up);
            }
            if picked.len() < 2 && down >= 0 && !picked.contains(&down) {
                picked.push(down);
            }
            step += 1;
        }

        picked.sort_unstable();
        (picked[0], picked[1])
    }

    // --- Explanation ---

    fn explanation(&self, op: Operation, args: &TemplateArgs, rng: &mut ChaCha8Rng) -> String {
        let fallback = || render(DEFAULT_EXPLANATION, args).unwrap_or_else(|_| args.answer.to_string());
        match self.catalog.templates_for(op).choose(rng) {
            Some(tpl) => render(tpl, args).unwrap_or_else(|e| {
                debug!("[Generator] Template {:?} failed ({}); using default", tpl, e);
                fallback()
            }),
            None => fallback(),
        }
    }
}

fn random_sign(rng: &mut ChaCha8Rng) -> i64 {
    if rng.gen::<bool>() {
        1
    } else {
        -1
    }
}

// --- Difficulty ---

/// 1..=10: log-magnitude, an operation bonus, and operand spread.
pub fn difficulty_score(op: Operation, num1: i32, num2: i32, answer: i64) -> u8 {
    let magnitude = match op {
        Operation::Addition | Operation::Subtraction => num1.max(num2) as f64,
        Operation::Multiplication => answer as f64,
        Operation::Division => num1 as f64,
    }
    .max(1.0);
    let base = magnitude.log10() * MAGNITUDE_LOG_FACTOR;
    let op_bonus = match op {
        Operation::Addition => BONUS_ADDITION,
        Operation::Subtraction => BONUS_SUBTRACTION,
        Operation::Multiplication => BONUS_MULTIPLICATION,
        Operation::Division => BONUS_DIVISION,
    };
    let spread = (num1 as i64 - num2 as i64).abs() as f64 / SPREAD_DIVISOR;
    let score = (base + op_bonus + spread).clamp(0.5, 10.0).round_ties_even();
    (score as i64).clamp(DIFFICULTY_MIN as i64, DIFFICULTY_MAX as i64) as u8
}

// --- Stable Id ---

/// Polynomial hash over the generation inputs, folded to a non-negative 31-bit value.
pub fn stable_id(seed: i64, op: Operation, num1: i32, num2: i32, answer: i64) -> u32 {
    let mut h = ID_HASH_SEED;
    for field in [seed, op.ordinal(), num1 as i64, num2 as i64, answer] {
        h = h.wrapping_mul(ID_HASH_MULTIPLIER).wrapping_add(field);
    }
    let folded = h ^ ((h as u64) >> 32) as i64;
    ((folded as i32) & 0x7FFF_FFFF) as u32
}
