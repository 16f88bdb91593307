// src/analytics.rs
//
// Progress statistics and rule-based recommendations over the answer history.
// Pure: everything is derived from the inputs, nothing is persisted here.

use crate::constants::*;
use crate::models::{
    DismissalLog, Operation, ProblemResult, ProgressReport, Recommendation, RecommendationIcon,
};
use chrono::Utc;
use log::debug;
use std::collections::BTreeMap;

pub const MORE_DATA_ID: &str = "more_data";
pub const ALL_GOOD_ID: &str = "all_good";
pub const WEAKEST_OP_PREFIX: &str = "weakest_op";
pub const RANGE_STRUGGLE_PREFIX: &str = "range_struggle";

// --- Public Interface ---

/// Report as of now, ignoring dismissals.
pub fn analyze(results: &[ProblemResult], highest_streak: u32) -> ProgressReport {
    analyze_with(
        results,
        highest_streak,
        &DismissalLog::new(),
        Utc::now().timestamp_millis(),
    )
}

/// Deterministic core of [`analyze`]: `now` is epoch millis.
pub fn analyze_with(
    results: &[ProblemResult],
    highest_streak: u32,
    dismissals: &DismissalLog,
    now: i64,
) -> ProgressReport {
    let mut accuracy_by_operation = BTreeMap::new();
    for op in Operation::ALL {
        let (correct, total) = tally(results.iter().filter(|r| r.operation == op));
        if total > 0 {
            accuracy_by_operation.insert(op, (correct, total));
        }
    }

    let window_start = now - RECENT_WINDOW_DAYS * DAY_MILLIS;
    let solved_last_7_days = results.iter().filter(|r| r.timestamp >= window_start).count();
    let total_solved = results.len();

    let average_per_day = match results.iter().map(|r| r.timestamp).min() {
        Some(oldest) => {
            let days = ((now - oldest) / DAY_MILLIS).max(1);
            total_solved as f64 / days as f64
        }
        None => 0.0,
    };

    let recommendations = recommendations(results, dismissals);
    debug!(
        "[Analytics] {} results, {} in last 7 days, {} recommendations",
        total_solved,
        solved_last_7_days,
        recommendations.len()
    );

    ProgressReport {
        accuracy_by_operation,
        problems_solved_last_7_days: solved_last_7_days as u32,
        total_problems_solved: total_solved as u32,
        longest_streak: highest_streak,
        average_problems_per_day: average_per_day,
        recommendations,
    }
}

/// Rules, in order: not enough data, weakest operation, number-range
/// struggles, and "all good" when nothing else fired.
pub fn recommendations(results: &[ProblemResult], dismissals: &DismissalLog) -> Vec<Recommendation> {
    if results.len() < MIN_ATTEMPTS_FOR_INSIGHT {
        return retain_active(vec![more_data()], results, dismissals);
    }

    let mut recs = Vec::new();

    let weak_cutoff = family_cutoff(dismissals, WEAKEST_OP_PREFIX);
    let weak_pool = newer_than(results, weak_cutoff);
    recs.extend(find_weakest_operation(&weak_pool));

    let range_cutoff = family_cutoff(dismissals, RANGE_STRUGGLE_PREFIX);
    let range_pool = newer_than(results, range_cutoff);
    recs.extend(find_number_range_struggles(&range_pool));

    if recs.is_empty() {
        recs.push(all_good());
    }

    retain_active(recs, results, dismissals)
}

// --- Rules ---

fn find_weakest_operation(results: &[&ProblemResult]) -> Option<Recommendation> {
    let (op, accuracy) = Operation::ALL
        .into_iter()
        .filter_map(|op| {
            let (correct, total) = tally(results.iter().copied().filter(|r| r.operation == op));
            (total as usize >= MIN_ATTEMPTS_FOR_INSIGHT).then(|| (op, ratio(correct, total)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    if accuracy >= WEAK_ACCURACY_THRESHOLD {
        return None;
    }
    debug!("[Analytics] Weakest operation {} at {:.2}", op, accuracy);

    let name = op.display_name().to_lowercase();
    Some(Recommendation {
        id: format!("{}_{}", WEAKEST_OP_PREFIX, op.as_str()),
        icon: RecommendationIcon::Insight,
        title: format!("Focus on {}", name),
        description: format!(
            "Your {} accuracy is {}%. A few extra rounds will pay off.",
            name,
            percent(accuracy)
        ),
        detail_title: format!("Why {}?", name),
        detail_description: format!(
            "Of the operations you practise regularly, {} has the lowest accuracy. \
             Try lowering the maximum number for a while, then build back up.",
            name
        ),
    })
}

fn find_number_range_struggles(results: &[&ProblemResult]) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    for op in Operation::ALL {
        let buckets: Vec<((i32, i32), f64)> = NUMBER_RANGES
            .iter()
            .filter_map(|&(lo, hi)| {
                let (correct, total) = tally(results.iter().copied().filter(|r| {
                    r.operation == op && (lo..=hi).contains(&r.max_operand())
                }));
                (total as usize >= MIN_ATTEMPTS_PER_RANGE).then(|| ((lo, hi), ratio(correct, total)))
            })
            .collect();

        // One recommendation per operation: the first significant drop wins.
        let drop = buckets
            .windows(2)
            .find(|pair| pair[0].1 - pair[1].1 > SIGNIFICANT_DROP_THRESHOLD);
        if let Some(pair) = drop {
            let ((_, range_end), before) = pair[0];
            let ((next_start, _), after) = pair[1];
            debug!(
                "[Analytics] {} accuracy drops {:.2} -> {:.2} past {}",
                op, before, after, range_end
            );
            recs.push(range_struggle(op, range_end, next_start, before, after));
        }
    }
    recs
}

fn range_struggle(op: Operation, range_end: i32, next_start: i32, before: f64, after: f64) -> Recommendation {
    let name = op.display_name().to_lowercase();
    Recommendation {
        id: format!(
            "{}_{}_{}_{}",
            RANGE_STRUGGLE_PREFIX,
            op.as_str(),
            range_end,
            next_start
        ),
        icon: RecommendationIcon::Insight,
        title: "Bigger numbers are tricky".to_string(),
        description: format!(
            "Your {} accuracy drops once numbers go past {}.",
            name, range_end
        ),
        detail_title: format!("{} above {}", op.display_name(), range_end),
        detail_description: format!(
            "You answer {}% correctly with numbers up to {}, but {}% from {} upward. \
             Practise a few problems just past {} before moving on.",
            percent(before),
            range_end,
            percent(after),
            next_start,
            range_end
        ),
    }
}

fn more_data() -> Recommendation {
    Recommendation {
        id: MORE_DATA_ID.to_string(),
        icon: RecommendationIcon::Insight,
        title: "Keep going".to_string(),
        description: format!(
            "Solve at least {} problems to unlock personal insights.",
            MIN_ATTEMPTS_FOR_INSIGHT
        ),
        detail_title: "How insights work".to_string(),
        detail_description: "Insights compare your accuracy across operations and number \
                             sizes. They need a handful of answers before the numbers mean anything."
            .to_string(),
    }
}

fn all_good() -> Recommendation {
    Recommendation {
        id: ALL_GOOD_ID.to_string(),
        icon: RecommendationIcon::CheckCircle,
        title: "Looking strong".to_string(),
        description: "No weak spots right now. Consider raising the difficulty.".to_string(),
        detail_title: "All good".to_string(),
        detail_description: "Your accuracy is steady across every operation and number range \
                             you practise."
            .to_string(),
    }
}

// --- Helpers ---

/// (correct, total)
fn tally<'a>(results: impl Iterator<Item = &'a ProblemResult>) -> (u32, u32) {
    results.fold((0, 0), |(correct, total), r| {
        (correct + r.was_correct as u32, total + 1)
    })
}

fn ratio(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

fn percent(accuracy: f64) -> u32 {
    (accuracy * 100.0).round() as u32
}

/// Latest dismissal among ids of one family (`weakest_op_*`, `range_struggle_*`).
fn family_cutoff(dismissals: &DismissalLog, prefix: &str) -> Option<i64> {
    dismissals
        .iter()
        .filter(|(id, _)| id.starts_with(prefix))
        .map(|(_, &at)| at)
        .max()
}

fn newer_than(results: &[ProblemResult], cutoff: Option<i64>) -> Vec<&ProblemResult> {
    results
        .iter()
        .filter(|r| cutoff.map_or(true, |c| r.timestamp > c))
        .collect()
}

/// Drops dismissed recommendations unless an answer arrived after the dismissal.
fn retain_active(
    recs: Vec<Recommendation>,
    results: &[ProblemResult],
    dismissals: &DismissalLog,
) -> Vec<Recommendation> {
    recs.into_iter()
        .filter(|rec| match dismissals.get(&rec.id) {
            Some(&at) => results.iter().any(|r| r.timestamp > at),
            None => true,
        })
        .collect()
}
