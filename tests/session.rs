use chrono::NaiveDate;
use math_hero::analytics::MORE_DATA_ID;
use math_hero::config::AppConfig;
use math_hero::constants::DAY_MILLIS;
use math_hero::database::init_db;
use math_hero::models::{DifficultyLevel, DifficultySettings, Operation, ProblemResult};
use math_hero::pedagogy::{self, ProblemKind, ServedProblem};
use math_hero::repository;
use math_hero::{AppError, ProblemGenerator};
use rusqlite::Connection;

const NOW: i64 = 1_717_200_000_000;

fn setup() -> (Connection, ProblemGenerator, AppConfig) {
    let conn = Connection::open_in_memory().unwrap();
    init_db(&conn).unwrap();
    (conn, ProblemGenerator::with_defaults().unwrap(), AppConfig::default())
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn bonus(g: &ProblemGenerator, conn: &Connection, seed: i64) -> ServedProblem {
    pedagogy::problem_for_seed(conn, g, ProblemKind::Bonus, seed).unwrap()
}

#[test]
fn daily_problem_is_stable_for_a_day() {
    let (conn, g, _) = setup();
    let a = pedagogy::get_daily_problem(&conn, &g, today()).unwrap();
    let b = pedagogy::get_daily_problem(&conn, &g, today()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.kind, ProblemKind::Daily);
    assert_eq!(a.seed, 153 * 1000 + 2024);

    let tomorrow = today().succ_opt().unwrap();
    let c = pedagogy::get_daily_problem(&conn, &g, tomorrow).unwrap();
    assert_ne!(a.seed, c.seed);
}

#[test]
fn next_problem_switches_to_bonus_once_daily_is_answered() {
    let (conn, g, cfg) = setup();
    let first = pedagogy::next_problem(&conn, &g, today()).unwrap();
    assert_eq!(first.kind, ProblemKind::Daily);

    let answer = first.problem.answer.clone();
    let outcome = pedagogy::process_answer(&conn, &cfg, &first, &answer, NOW).unwrap();
    assert!(outcome.was_correct);
    assert_eq!(outcome.streak, 1);

    let second = pedagogy::next_problem(&conn, &g, today()).unwrap();
    assert_eq!(second.kind, ProblemKind::Bonus);

    let tomorrow = today().succ_opt().unwrap();
    let third = pedagogy::next_problem(&conn, &g, tomorrow).unwrap();
    assert_eq!(third.kind, ProblemKind::Daily);
}

#[test]
fn answers_are_checked_against_the_problem_that_was_shown() {
    let (conn, g, cfg) = setup();
    let settings = DifficultySettings::new([Operation::Addition], 200);
    pedagogy::set_difficulty(&conn, &settings).unwrap();
    repository::set_streak(&conn, 40).unwrap();

    let shown: Vec<ServedProblem> = (100..120).map(|seed| bonus(&g, &conn, seed)).collect();

    // A miss elsewhere moves the streak before any of them is answered.
    let other = bonus(&g, &conn, 999);
    let wrong = other.problem.distractor1.clone();
    pedagogy::process_answer(&conn, &cfg, &other, &wrong, NOW).unwrap();
    assert_eq!(repository::get_streak(&conn).unwrap(), 0);

    let mut changed = false;
    for (i, s) in shown.iter().enumerate() {
        let streak = repository::get_streak(&conn).unwrap();
        changed |= g.generate(&settings, streak, s.seed) != s.problem;
        let outcome = pedagogy::answer_served(&conn, &cfg, s.seed, &s.problem.answer, NOW + 1).unwrap();
        assert!(outcome.was_correct, "{:?}", s.problem);
        assert_eq!(outcome.streak, i as u32 + 1);
    }
    assert!(changed, "streak change should alter regenerated problems");

    let archived = repository::get_archived_problems(&conn).unwrap();
    assert_eq!(archived[0], shown[19].problem);

    // Answered problems are no longer waiting.
    assert!(matches!(
        pedagogy::answer_served(&conn, &cfg, 100, "1", NOW + 2),
        Err(AppError::NotServed(100))
    ));
}

#[test]
fn daily_problem_counts_once() {
    let (conn, g, cfg) = setup();
    let daily = pedagogy::get_daily_problem(&conn, &g, today()).unwrap();
    let answer = daily.problem.answer.clone();
    pedagogy::process_answer(&conn, &cfg, &daily, &answer, NOW).unwrap();

    for i in 1..4 {
        let again = pedagogy::get_daily_problem(&conn, &g, today()).unwrap();
        let answer = again.problem.answer.clone();
        let err = pedagogy::process_answer(&conn, &cfg, &again, &answer, NOW + i).unwrap_err();
        assert!(matches!(err, AppError::AlreadyAnswered(seed) if seed == daily.seed));
        let err = pedagogy::answer_served(&conn, &cfg, again.seed, &answer, NOW + i).unwrap_err();
        assert!(matches!(err, AppError::AlreadyAnswered(_)));
    }

    assert_eq!(repository::get_streak(&conn).unwrap(), 1);
    assert_eq!(repository::get_history(&conn).unwrap().len(), 1);
    assert_eq!(repository::get_archived_problems(&conn).unwrap().len(), 1);

    // Tomorrow's problem is a new daily.
    let tomorrow = pedagogy::get_daily_problem(&conn, &g, today().succ_opt().unwrap()).unwrap();
    let answer = tomorrow.problem.answer.clone();
    let outcome = pedagogy::process_answer(&conn, &cfg, &tomorrow, &answer, NOW + 10).unwrap();
    assert_eq!(outcome.streak, 2);
}

#[test]
fn failed_answer_writes_nothing() {
    let (conn, g, cfg) = setup();
    repository::set_streak(&conn, 5).unwrap();
    let served = bonus(&g, &conn, 31);
    conn.execute_batch("DROP TABLE problem_results").unwrap();

    let answer = served.problem.answer.clone();
    let err = pedagogy::process_answer(&conn, &cfg, &served, &answer, NOW).unwrap_err();
    assert!(matches!(err, AppError::Db(_)));

    assert!(repository::get_archived_problems(&conn).unwrap().is_empty());
    assert_eq!(repository::get_streak(&conn).unwrap(), 5);
    assert_eq!(pedagogy::served_problem(&conn, 31).unwrap(), served);
}

#[test]
fn correct_answers_build_streak_and_rank() {
    let (conn, g, cfg) = setup();
    repository::set_streak(&conn, 9).unwrap();
    repository::set_highest_streak(&conn, 9).unwrap();

    let served = bonus(&g, &conn, 5);
    let answer = served.problem.answer.clone();
    let outcome = pedagogy::process_answer(&conn, &cfg, &served, &answer, NOW).unwrap();
    assert!(outcome.ranked_up);
    assert_eq!(outcome.rank.name, "Apprentice");
    assert_eq!(outcome.highest_streak, 10);
    assert_eq!(repository::get_highest_streak(&conn).unwrap(), 10);

    let served = bonus(&g, &conn, 6);
    let answer = served.problem.answer.clone();
    let outcome = pedagogy::process_answer(&conn, &cfg, &served, &answer, NOW + 1).unwrap();
    assert!(!outcome.ranked_up);
    assert_eq!(outcome.streak, 11);
}

#[test]
fn wrong_answer_resets_streak_but_keeps_highest() {
    let (conn, g, cfg) = setup();
    repository::set_streak(&conn, 4).unwrap();
    repository::set_highest_streak(&conn, 7).unwrap();

    let served = bonus(&g, &conn, 8);
    let wrong = served.problem.distractor1.clone();
    let outcome = pedagogy::process_answer(&conn, &cfg, &served, &wrong, NOW).unwrap();
    assert!(!outcome.was_correct);
    assert_eq!(outcome.correct_answer, served.problem.answer);
    assert_eq!(outcome.streak, 0);
    assert_eq!(outcome.highest_streak, 7);
    assert_eq!(repository::get_streak(&conn).unwrap(), 0);
}

#[test]
fn three_misses_suggest_lower_difficulty() {
    let (conn, g, cfg) = setup();
    pedagogy::set_difficulty(&conn, &DifficultyLevel::Adept.settings()).unwrap();

    let mut suggestions = Vec::new();
    for seed in 0..3 {
        let served = bonus(&g, &conn, seed);
        let wrong = served.problem.distractor2.clone();
        let outcome = pedagogy::process_answer(&conn, &cfg, &served, &wrong, NOW + seed).unwrap();
        suggestions.push(outcome.suggest_lower_difficulty);
    }
    assert_eq!(suggestions, vec![false, false, true]);

    // Changing difficulty starts the count over.
    pedagogy::set_difficulty(&conn, &DifficultyLevel::Apprentice.settings()).unwrap();
    assert_eq!(repository::get_consecutive_wrong(&conn).unwrap(), 0);
}

#[test]
fn no_suggestion_on_novice_or_when_disabled() {
    let (conn, g, cfg) = setup();
    let miss = |seed: i64| {
        let served = bonus(&g, &conn, seed);
        let wrong = served.problem.distractor1.clone();
        pedagogy::process_answer(&conn, &cfg, &served, &wrong, NOW + seed)
            .unwrap()
            .suggest_lower_difficulty
    };

    for seed in 0..4 {
        assert!(!miss(seed), "novice never suggests");
    }

    pedagogy::set_difficulty(&conn, &DifficultyLevel::Master.settings()).unwrap();
    pedagogy::disable_difficulty_suggestions(&conn).unwrap();
    for seed in 10..14 {
        assert!(!miss(seed), "suggestions disabled");
    }
}

#[test]
fn archive_keeps_seven_newest_without_duplicates() {
    let (conn, g, cfg) = setup();
    pedagogy::set_difficulty(&conn, &DifficultySettings::new(Operation::ALL, 200)).unwrap();

    let mut served = Vec::new();
    for seed in 0..9 {
        let s = bonus(&g, &conn, seed * 7919);
        let answer = s.problem.answer.clone();
        pedagogy::process_answer(&conn, &cfg, &s, &answer, NOW + seed).unwrap();
        served.push(s);
    }
    // Answering an already archived problem moves it to the front.
    let again = served[5].clone();
    pedagogy::process_answer(&conn, &cfg, &again, "0", NOW + 100).unwrap();

    let archived = repository::get_archived_problems(&conn).unwrap();
    assert_eq!(archived.len(), 7);
    assert_eq!(archived[0].id, again.problem.id);
    let mut ids: Vec<u32> = archived.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 7);
    assert!(!archived.iter().any(|p| p.id == served[0].problem.id));
}

#[test]
fn history_is_capped_at_five_hundred() {
    let (conn, _, cfg) = setup();
    for i in 0..510 {
        let r = ProblemResult {
            timestamp: NOW + i,
            operation: Operation::Addition,
            was_correct: true,
            num1: 1,
            num2: 1,
            answer: 2,
        };
        repository::log_result(&conn, &r, cfg.max_history).unwrap();
    }
    let history = repository::get_history(&conn).unwrap();
    assert_eq!(history.len(), 500);
    assert_eq!(history[0].timestamp, NOW + 10);
}

#[test]
fn kid_mode_answers_only_feed_analytics() {
    let (conn, g, cfg) = setup();
    repository::set_streak(&conn, 3).unwrap();

    let settings = DifficultySettings::new([Operation::Multiplication], 9);
    let served = pedagogy::kid_mode_problem(&g, &settings, 2);
    assert_eq!(served.problem.operator, "×");
    let answer = served.problem.answer.clone();
    assert!(pedagogy::record_kid_mode_answer(&conn, &cfg, &served.problem, &answer, NOW).unwrap());

    assert_eq!(repository::get_streak(&conn).unwrap(), 3);
    assert!(repository::get_archived_problems(&conn).unwrap().is_empty());
    assert_eq!(repository::get_history(&conn).unwrap().len(), 1);
}

#[test]
fn dismissed_weakness_returns_only_with_new_evidence() {
    let (conn, _, cfg) = setup();
    let log = |op: Operation, correct: bool, ts: i64| {
        let r = ProblemResult { timestamp: ts, operation: op, was_correct: correct, num1: 4, num2: 3, answer: 1 };
        repository::log_result(&conn, &r, cfg.max_history).unwrap();
    };

    let start = NOW - 3 * DAY_MILLIS;
    for i in 0..12 {
        log(Operation::Addition, true, start + i);
        log(Operation::Subtraction, i < 2, start + 100 + i);
    }
    let report = pedagogy::progress_report(&conn, NOW).unwrap();
    let ids: Vec<_> = report.recommendations.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec!["weakest_op_SUBTRACTION".to_string()]);
    assert_eq!(report.total_problems_solved, 24);
    assert!((report.average_problems_per_day - 8.0).abs() < 1e-9);

    pedagogy::dismiss_recommendation(&conn, "weakest_op_SUBTRACTION", NOW - DAY_MILLIS).unwrap();
    let report = pedagogy::progress_report(&conn, NOW).unwrap();
    assert!(report.recommendations.iter().all(|r| r.id != "weakest_op_SUBTRACTION"));

    // Nine fresh subtraction answers are not enough to judge again.
    for i in 0..9 {
        log(Operation::Subtraction, false, NOW - 1_000 + i);
    }
    let report = pedagogy::progress_report(&conn, NOW).unwrap();
    assert!(report.recommendations.iter().all(|r| r.id != "weakest_op_SUBTRACTION"));

    log(Operation::Subtraction, false, NOW - 10);
    let report = pedagogy::progress_report(&conn, NOW).unwrap();
    assert!(report.recommendations.iter().any(|r| r.id == "weakest_op_SUBTRACTION"));
}

#[test]
fn empty_database_reports_more_data() {
    let (conn, _, _) = setup();
    let report = pedagogy::progress_report(&conn, NOW).unwrap();
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].id, MORE_DATA_ID);
}
