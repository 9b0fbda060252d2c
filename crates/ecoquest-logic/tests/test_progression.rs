//! Integration tests for the full progression pipeline.
//!
//! Exercises: QuizSession → QuizResult → complete_mission → level gate
//! → speed challenges → achievements → integrity checks.
//!
//! All tests are pure logic with no storage or frontend.

use std::collections::BTreeSet;

use ecoquest_logic::achievements::check_achievements;
use ecoquest_logic::catalog::{mission_ids, MISSIONS};
use ecoquest_logic::integrity::{compute_checksum, validate_structure};
use ecoquest_logic::progress::PlayerProgress;
use ecoquest_logic::resolver::{is_accessible, list_available};
use ecoquest_logic::scoring::{NextStep, Question, QuizConfig, QuizResult, QuizSession};
use ecoquest_logic::transactions::{
    collect_item, complete_mission, record_speed_challenge, spend_coins, TransactionError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

fn questions_for(mission: u32) -> Vec<Question> {
    (0..mission as usize)
        .map(|i| Question::new(&format!("M{} Q{}", mission, i + 1), &["a", "b", "c"], i % 3))
        .collect()
}

/// Play a whole quiz, answering each question correctly after
/// `secs_per_question` seconds.
fn play_quiz(mission: u32, secs_per_question: f64) -> QuizResult {
    let qs = questions_for(mission);
    let answers: Vec<usize> = qs.iter().map(|q| q.correct_index).collect();
    let mut session = QuizSession::start(mission, qs, QuizConfig::default()).unwrap();
    for (i, answer) in answers.iter().enumerate() {
        session.tick(secs_per_question);
        let outcome = session.submit(*answer).unwrap();
        if i + 1 < answers.len() {
            session.advance().unwrap();
        } else {
            assert_eq!(outcome.next, NextStep::MissionPassed);
        }
    }
    session.result().unwrap()
}

/// Complete missions in an order that respects the gates.
fn play_through(ids: impl IntoIterator<Item = u32>) -> PlayerProgress {
    let mut p = PlayerProgress::new("Ana");
    for id in ids {
        let result = play_quiz(id, 3.0);
        p = complete_mission(&p, id, &result, 1_000).unwrap().0;
    }
    p
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn ana_first_mission() {
    let p = complete_mission(
        &PlayerProgress::new("Ana"),
        1,
        &QuizResult::passed(1, 7.0, 50),
        1,
    )
    .unwrap()
    .0;
    assert_eq!(p.coins, 20);
    assert_eq!(p.badges, vec!["Eco-Kabataan".to_string()]);
    assert_eq!(p.completed_set(), BTreeSet::from([1]));
    assert_eq!(p.total_score, 150);
    assert_eq!(p.level, 1);
}

#[test]
fn quiz_points_flow_into_score() {
    let result = play_quiz(1, 4.0);
    assert_eq!(result.points, 50);
    let slow = play_quiz(2, 25.0);
    assert_eq!(slow.points, 30);
}

#[test]
fn mission_two_before_one_is_rejected() {
    let p = PlayerProgress::new("Ana");
    let err = complete_mission(&p, 2, &QuizResult::passed(2, 5.0, 50), 1).unwrap_err();
    assert_eq!(err, TransactionError::MissionLocked(2));
    assert_eq!(p, PlayerProgress::new("Ana"));
}

#[test]
fn overspend_is_rejected() {
    let p = play_through([1]);
    assert!(spend_coins(&p, 1000, 1).is_err());
    assert_eq!(p.coins, 20);
}

#[test]
fn speed_samples_bucketed() {
    let mut p = PlayerProgress::new("Ana");
    for t in [5.0, 15.0, 35.0] {
        p = record_speed_challenge(&p, t, 1).0;
    }
    assert_eq!(
        (
            p.speed_challenges.excellent,
            p.speed_challenges.great,
            p.speed_challenges.good
        ),
        (1, 1, 0)
    );
    assert_eq!(p.fastest_quiz_time, Some(5.0));
}

#[test]
fn level_two_exactly_on_tenth_completion() {
    let mut p = PlayerProgress::new("Ana");
    // One failed attempt keeps accuracy at 10/11, well above 70%.
    p = complete_mission(&p, 1, &QuizResult::failed(1, 90.0), 1).unwrap().0;
    for id in 1..=10 {
        assert_eq!(p.level, 1);
        p = complete_mission(&p, id, &play_quiz(id, 2.0), 1).unwrap().0;
    }
    assert_eq!(p.level, 2);
}

#[test]
fn full_catalog_play_through_stays_valid() {
    let p = play_through(mission_ids());
    assert_eq!(p.badges.len(), MISSIONS.len());
    assert!(list_available(&p.completed_set()).is_empty());
    assert!(validate_structure(&p).is_empty());
    assert_eq!(p.level, 2);
}

// ── Properties ─────────────────────────────────────────────────────────

#[test]
fn random_completion_attempts_respect_gates() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mut p = PlayerProgress::new("Ana");
        for _ in 0..60 {
            let id = rng.gen_range(1..=20u32);
            let accessible = is_accessible(id, &p.completed_set());
            let before = p.clone();
            match complete_mission(&p, id, &QuizResult::passed(id, 8.0, 50), 1) {
                Ok((next, _)) => {
                    assert!(accessible);
                    p = next;
                }
                Err(TransactionError::MissionLocked(_)) => {
                    assert!(!accessible);
                    assert_eq!(p, before);
                }
                Err(other) => panic!("unexpected error {other}"),
            }
        }
        assert!(validate_structure(&p).is_empty());
        assert_eq!(p.badges.len(), p.completed_missions.len());
    }
}

#[test]
fn repeated_completion_is_idempotent() {
    let p = play_through([1, 2, 3]);
    let checksum = compute_checksum(&p);
    let mut q = p.clone();
    for _ in 0..5 {
        q = complete_mission(&q, 2, &QuizResult::passed(2, 1.0, 50), 99)
            .unwrap()
            .0;
    }
    assert_eq!(q, p);
    assert_eq!(compute_checksum(&q), checksum);
}

#[test]
fn collected_count_equals_distinct_ids() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut p = PlayerProgress::new("Ana");
    let mut distinct = BTreeSet::new();
    for _ in 0..200 {
        let id = format!("pickup_{}", rng.gen_range(0..25));
        distinct.insert(id.clone());
        p = collect_item(&p, &id, 1, 2, 1).unwrap().0;
        assert_eq!(p.total_items_collected(), distinct.len());
    }
    assert_eq!(p.collected_items, distinct);
}

#[test]
fn achievements_are_stable_without_new_samples() {
    let mut p = PlayerProgress::new("Ana");
    for _ in 0..5 {
        p = record_speed_challenge(&p, 9.0, 1).0;
    }
    let a = check_achievements(&p);
    let b = check_achievements(&p);
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}
