//! Progress transactions: the only way to produce a new snapshot.
//!
//! Every function takes the current [`PlayerProgress`] by reference and
//! returns a fresh one. On error nothing is produced, so a rejected
//! operation can never leave a half-applied snapshot behind.
//!
//! ```
//! use ecoquest_logic::progress::PlayerProgress;
//! use ecoquest_logic::scoring::QuizResult;
//! use ecoquest_logic::transactions::complete_mission;
//!
//! let fresh = PlayerProgress::new("Ana");
//! let (p, _) = complete_mission(&fresh, 1, &QuizResult::passed(1, 8.0, 50), 0).unwrap();
//! assert_eq!(p.coins, 20);
//! assert_eq!(p.badges, vec!["Eco-Kabataan".to_string()]);
//! assert_eq!(p.total_score, 150);
//! assert_eq!(p.level, 1);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::achievements::{unclaimed_achievements, Achievement};
use crate::catalog::{self, level_requirement, MissionId, MAX_LEVEL};
use crate::progress::{PlayerProgress, DEFAULT_TITLE};
use crate::resolver::is_accessible;
use crate::scoring::{QuizResult, SpeedTier};

/// Rejected precondition. The input snapshot is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("mission {0} is not in the catalog")]
    UnknownMission(MissionId),
    #[error("mission {0} is locked: prerequisites not completed")]
    MissionLocked(MissionId),
    #[error("quiz result is for mission {result}, not mission {mission}")]
    ResultMismatch { mission: MissionId, result: MissionId },
    #[error("cannot spend {requested} coins with a balance of {available}")]
    InsufficientCoins { requested: u64, available: u64 },
    #[error("item {0} was already purchased")]
    AlreadyPurchased(String),
    #[error("title {0:?} has not been earned")]
    TitleNotEarned(String),
    #[error("{0} would exceed its maximum value")]
    Overflow(&'static str),
}

fn checked_add(value: u64, amount: u64, field: &'static str) -> Result<u64, TransactionError> {
    value
        .checked_add(amount)
        .ok_or(TransactionError::Overflow(field))
}

/// Add `amount` to both the balance and the lifetime total.
fn credit_coins(progress: &mut PlayerProgress, amount: u64) -> Result<(), TransactionError> {
    let coins = checked_add(progress.coins, amount, "coins")?;
    let earned = checked_add(progress.total_coins_earned, amount, "total_coins_earned")?;
    progress.coins = coins;
    progress.total_coins_earned = earned;
    Ok(())
}

/// What `complete_mission` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionOutcome {
    /// The mission was already complete; nothing changed.
    AlreadyCompleted,
    /// The quiz was failed; only accuracy statistics moved.
    AttemptFailed,
    Completed {
        badge: String,
        coins_awarded: u64,
        points_awarded: u64,
        /// New level, when this completion triggered a level-up.
        leveled_up: Option<u32>,
    },
}

// ============================================================================
// MISSIONS & LEVELS
// ============================================================================

/// Apply a finished quiz to the progress.
///
/// Checks, in order: the mission exists, the result belongs to it, and it
/// is accessible. An already completed mission is a no-op. A failed quiz
/// only counts toward the question total.
pub fn complete_mission(
    progress: &PlayerProgress,
    mission_id: MissionId,
    result: &QuizResult,
    now_ms: u64,
) -> Result<(PlayerProgress, CompletionOutcome), TransactionError> {
    let def = catalog::mission(mission_id).ok_or(TransactionError::UnknownMission(mission_id))?;
    if result.mission_id != mission_id {
        return Err(TransactionError::ResultMismatch {
            mission: mission_id,
            result: result.mission_id,
        });
    }
    if !is_accessible(mission_id, &progress.completed_set()) {
        return Err(TransactionError::MissionLocked(mission_id));
    }
    if progress.is_completed(mission_id) {
        return Ok((progress.clone(), CompletionOutcome::AlreadyCompleted));
    }

    let mut next = progress.clone();
    next.last_played_ms = now_ms;

    if !result.is_correct {
        next.total_questions += 1;
        return Ok((next, CompletionOutcome::AttemptFailed));
    }

    let points = checked_add(def.point_reward, result.points, "total_score")?;
    credit_coins(&mut next, def.coin_reward)?;
    next.total_score = checked_add(next.total_score, points, "total_score")?;
    next.badges.push(def.badge_name.to_string());
    next.completed_missions.push(mission_id);
    next.completed_quizzes.insert(mission_id);
    next.correct_answers += 1;
    next.total_questions += 1;

    let leveled_up = evaluate_level(&mut next);

    Ok((
        next,
        CompletionOutcome::Completed {
            badge: def.badge_name.to_string(),
            coins_awarded: def.coin_reward,
            points_awarded: points,
            leveled_up,
        },
    ))
}

/// Whether `progress` meets the requirement for leaving its level.
pub fn meets_level_requirement(progress: &PlayerProgress) -> bool {
    if progress.level >= MAX_LEVEL {
        return false;
    }
    let Some(req) = level_requirement(progress.level) else {
        return false;
    };
    // Scaled comparison: 7 of 10 is exactly 70%.
    let accuracy_ok = progress.total_questions > 0
        && progress.correct_answers as f64 * 100.0
            >= req.min_accuracy_percent * progress.total_questions as f64;
    progress.badge_count() >= req.badges_required && accuracy_ok
}

/// Advance at most one level. Levels never go down.
fn evaluate_level(progress: &mut PlayerProgress) -> Option<u32> {
    if meets_level_requirement(progress) {
        progress.level += 1;
        Some(progress.level)
    } else {
        None
    }
}

// ============================================================================
// COINS
// ============================================================================

/// Add coins to both the balance and the lifetime total.
///
/// Amounts are unsigned, so a negative grant cannot be expressed. A grant
/// that would overflow either total is rejected.
pub fn grant_coins(
    progress: &PlayerProgress,
    amount: u64,
    now_ms: u64,
) -> Result<PlayerProgress, TransactionError> {
    let mut next = progress.clone();
    credit_coins(&mut next, amount)?;
    next.last_played_ms = now_ms;
    Ok(next)
}

/// Remove coins from the balance. Rejected, not clamped, on overdraft.
pub fn spend_coins(
    progress: &PlayerProgress,
    amount: u64,
    now_ms: u64,
) -> Result<PlayerProgress, TransactionError> {
    if amount > progress.coins {
        return Err(TransactionError::InsufficientCoins {
            requested: amount,
            available: progress.coins,
        });
    }
    let mut next = progress.clone();
    next.coins -= amount;
    next.last_played_ms = now_ms;
    Ok(next)
}

/// Buy a shop item once.
pub fn purchase_item(
    progress: &PlayerProgress,
    item_id: &str,
    price: u64,
    now_ms: u64,
) -> Result<PlayerProgress, TransactionError> {
    if progress.purchased_items.contains(item_id) {
        return Err(TransactionError::AlreadyPurchased(item_id.to_string()));
    }
    let mut next = spend_coins(progress, price, now_ms)?;
    next.purchased_items.insert(item_id.to_string());
    Ok(next)
}

// ============================================================================
// WORLD PICKUPS
// ============================================================================

/// Collect a world item. Returns `granted = false` for repeat pickups.
pub fn collect_item(
    progress: &PlayerProgress,
    item_id: &str,
    coin_value: u64,
    point_value: u64,
    now_ms: u64,
) -> Result<(PlayerProgress, bool), TransactionError> {
    if progress.collected_items.contains(item_id) {
        return Ok((progress.clone(), false));
    }
    let mut next = progress.clone();
    credit_coins(&mut next, coin_value)?;
    next.total_score = checked_add(next.total_score, point_value, "total_score")?;
    next.collected_items.insert(item_id.to_string());
    next.last_played_ms = now_ms;
    Ok((next, true))
}

/// Claim an NPC's one-time coin reward.
pub fn claim_npc_reward(
    progress: &PlayerProgress,
    npc_id: &str,
    coins: u64,
    now_ms: u64,
) -> Result<(PlayerProgress, bool), TransactionError> {
    if progress.npc_rewards_claimed.contains(npc_id) {
        return Ok((progress.clone(), false));
    }
    let mut next = grant_coins(progress, coins, now_ms)?;
    next.npc_rewards_claimed.insert(npc_id.to_string());
    Ok((next, true))
}

// ============================================================================
// SPEED CHALLENGES & ACHIEVEMENTS
// ============================================================================

/// Record one timed quiz sample.
///
/// The sample lands in at most one bucket. Any valid sample, bucketed or
/// not, can become the new fastest time.
pub fn record_speed_challenge(
    progress: &PlayerProgress,
    elapsed_secs: f64,
    now_ms: u64,
) -> (PlayerProgress, Option<SpeedTier>) {
    let mut next = progress.clone();
    next.last_played_ms = now_ms;

    let tier = SpeedTier::classify(elapsed_secs);
    match tier {
        Some(SpeedTier::Excellent) => next.speed_challenges.excellent += 1,
        Some(SpeedTier::Great) => next.speed_challenges.great += 1,
        Some(SpeedTier::Good) => next.speed_challenges.good += 1,
        None => {}
    }

    if elapsed_secs.is_finite() && elapsed_secs >= 0.0 {
        let faster = match next.fastest_quiz_time {
            Some(best) => elapsed_secs < best,
            None => true,
        };
        if faster {
            next.fastest_quiz_time = Some(elapsed_secs);
        }
    }

    (next, tier)
}

/// Mark every newly earned achievement as claimed.
///
/// Returns the achievements claimed by this call, in a stable order.
/// A second call with unchanged counters returns nothing.
pub fn claim_achievements(
    progress: &PlayerProgress,
    now_ms: u64,
) -> (PlayerProgress, Vec<Achievement>) {
    let pending: Vec<Achievement> = unclaimed_achievements(progress).into_iter().collect();
    if pending.is_empty() {
        return (progress.clone(), pending);
    }
    let mut next = progress.clone();
    next.claimed_achievements.extend(pending.iter().copied());
    next.last_played_ms = now_ms;
    (next, pending)
}

// ============================================================================
// PROFILE
// ============================================================================

/// Titles the player may equip: the default plus every earned badge.
pub fn available_titles(progress: &PlayerProgress) -> Vec<String> {
    std::iter::once(DEFAULT_TITLE.to_string())
        .chain(progress.badges.iter().cloned())
        .collect()
}

pub fn equip_title(
    progress: &PlayerProgress,
    title: &str,
) -> Result<PlayerProgress, TransactionError> {
    if title != DEFAULT_TITLE && !progress.badges.iter().any(|b| b == title) {
        return Err(TransactionError::TitleNotEarned(title.to_string()));
    }
    let mut next = progress.clone();
    next.current_title = title.to_string();
    Ok(next)
}

pub fn record_steps(progress: &PlayerProgress, steps: u64) -> PlayerProgress {
    let mut next = progress.clone();
    next.steps_taken = next.steps_taken.saturating_add(steps);
    next
}

/// Add played time. Non-finite or negative durations are ignored.
pub fn add_playtime(progress: &PlayerProgress, secs: f64, now_ms: u64) -> PlayerProgress {
    let mut next = progress.clone();
    if secs.is_finite() && secs > 0.0 {
        next.playtime_secs += secs;
    }
    next.last_played_ms = now_ms;
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> PlayerProgress {
        PlayerProgress::new("Ana")
    }

    fn pass(p: &PlayerProgress, id: MissionId) -> PlayerProgress {
        complete_mission(p, id, &QuizResult::passed(id, 5.0, 50), 1).unwrap().0
    }

    #[test]
    fn first_mission_scenario() {
        let (p, outcome) =
            complete_mission(&ana(), 1, &QuizResult::passed(1, 5.0, 50), 1000).unwrap();
        assert_eq!(p.coins, 20);
        assert_eq!(p.total_coins_earned, 20);
        assert_eq!(p.badges, vec!["Eco-Kabataan"]);
        assert_eq!(p.completed_missions, vec![1]);
        assert!(p.completed_quizzes.contains(&1));
        assert_eq!(p.total_score, 150);
        assert_eq!(p.correct_answers, 1);
        assert_eq!(p.total_questions, 1);
        assert_eq!(p.level, 1);
        assert_eq!(p.last_played_ms, 1000);
        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                badge: "Eco-Kabataan".into(),
                coins_awarded: 20,
                points_awarded: 150,
                leveled_up: None,
            }
        );
    }

    #[test]
    fn locked_mission_rejected() {
        let start = ana();
        let err = complete_mission(&start, 2, &QuizResult::passed(2, 5.0, 50), 1).unwrap_err();
        assert_eq!(err, TransactionError::MissionLocked(2));
        assert_eq!(start, ana());
    }

    #[test]
    fn unknown_and_mismatched_missions_rejected() {
        let p = ana();
        assert_eq!(
            complete_mission(&p, 77, &QuizResult::passed(77, 1.0, 0), 1).unwrap_err(),
            TransactionError::UnknownMission(77)
        );
        assert_eq!(
            complete_mission(&p, 1, &QuizResult::passed(2, 1.0, 0), 1).unwrap_err(),
            TransactionError::ResultMismatch {
                mission: 1,
                result: 2
            }
        );
    }

    #[test]
    fn completing_twice_is_a_no_op() {
        let once = pass(&ana(), 1);
        let (twice, outcome) =
            complete_mission(&once, 1, &QuizResult::passed(1, 5.0, 50), 99).unwrap();
        assert_eq!(outcome, CompletionOutcome::AlreadyCompleted);
        assert_eq!(twice, once);
        let (thrice, _) = complete_mission(&twice, 1, &QuizResult::passed(1, 5.0, 50), 99).unwrap();
        assert_eq!(thrice, once);
    }

    #[test]
    fn failed_attempt_counts_question_only() {
        let (p, outcome) = complete_mission(&ana(), 1, &QuizResult::failed(1, 70.0), 5).unwrap();
        assert_eq!(outcome, CompletionOutcome::AttemptFailed);
        assert_eq!(p.total_questions, 1);
        assert_eq!(p.correct_answers, 0);
        assert_eq!(p.coins, 0);
        assert!(p.badges.is_empty());
        assert_eq!(p.last_played_ms, 5);
    }

    #[test]
    fn level_up_on_tenth_mission() {
        let mut p = ana();
        for id in 1..=9 {
            p = pass(&p, id);
            assert_eq!(p.level, 1, "levelled early after mission {}", id);
        }
        let (p, outcome) = complete_mission(&p, 10, &QuizResult::passed(10, 5.0, 50), 1).unwrap();
        assert_eq!(p.level, 2);
        assert!(matches!(
            outcome,
            CompletionOutcome::Completed {
                leveled_up: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn low_accuracy_blocks_level_up() {
        let mut p = ana();
        // Five failed attempts: 10 correct of 15 is below 70%.
        for _ in 0..5 {
            p = complete_mission(&p, 1, &QuizResult::failed(1, 90.0), 1).unwrap().0;
        }
        for id in 1..=10 {
            p = pass(&p, id);
        }
        assert_eq!(p.badge_count(), 10);
        assert_eq!(p.level, 1);
    }

    #[test]
    fn accuracy_exactly_at_threshold_levels_up() {
        let mut p = ana();
        for _ in 0..3 {
            p = complete_mission(&p, 1, &QuizResult::failed(1, 90.0), 1).unwrap().0;
        }
        // 10 of 13 = 76.9%, then check the exact 70% boundary separately.
        for id in 1..=10 {
            p = pass(&p, id);
        }
        assert_eq!(p.level, 2);

        let mut q = ana();
        q.correct_answers = 7;
        q.total_questions = 10;
        q.badges = (0..10).map(|i| i.to_string()).collect();
        assert!(meets_level_requirement(&q));
    }

    #[test]
    fn level_never_regresses() {
        let mut p = ana();
        for id in 1..=10 {
            p = pass(&p, id);
        }
        assert_eq!(p.level, 2);
        for _ in 0..20 {
            p = complete_mission(&p, 11, &QuizResult::failed(11, 90.0), 1).unwrap().0;
        }
        assert!(p.accuracy_percent() < 70.0);
        assert_eq!(p.level, 2);
    }

    #[test]
    fn spend_rejects_overdraft() {
        let p = pass(&ana(), 1);
        let err = spend_coins(&p, 1000, 1).unwrap_err();
        assert_eq!(
            err,
            TransactionError::InsufficientCoins {
                requested: 1000,
                available: 20
            }
        );
        assert_eq!(p.coins, 20);
        let spent = spend_coins(&p, 15, 1).unwrap();
        assert_eq!(spent.coins, 5);
        assert_eq!(spent.total_coins_earned, 20);
    }

    #[test]
    fn grant_raises_balance_and_lifetime() {
        let p = grant_coins(&ana(), 40, 1).unwrap();
        assert_eq!(p.coins, 40);
        assert_eq!(p.total_coins_earned, 40);
    }

    #[test]
    fn purchase_once() {
        let p = grant_coins(&ana(), 100, 1).unwrap();
        let p = purchase_item(&p, "bamboo_hat", 30, 2).unwrap();
        assert_eq!(p.coins, 70);
        assert!(p.purchased_items.contains("bamboo_hat"));
        assert_eq!(
            purchase_item(&p, "bamboo_hat", 30, 3).unwrap_err(),
            TransactionError::AlreadyPurchased("bamboo_hat".into())
        );
        assert!(matches!(
            purchase_item(&p, "solar_lamp", 500, 3).unwrap_err(),
            TransactionError::InsufficientCoins { .. }
        ));
    }

    #[test]
    fn collect_item_is_idempotent() {
        let (p, granted) = collect_item(&ana(), "shell_01", 5, 10, 1).unwrap();
        assert!(granted);
        assert_eq!(p.coins, 5);
        assert_eq!(p.total_score, 10);
        let (again, granted) = collect_item(&p, "shell_01", 5, 10, 2).unwrap();
        assert!(!granted);
        assert_eq!(again, p);
        assert_eq!(again.total_items_collected(), 1);
    }

    #[test]
    fn npc_reward_once() {
        let (p, granted) = claim_npc_reward(&ana(), "lola_nena", 15, 1).unwrap();
        assert!(granted);
        assert_eq!(p.coins, 15);
        let (p2, granted) = claim_npc_reward(&p, "lola_nena", 15, 2).unwrap();
        assert!(!granted);
        assert_eq!(p2.coins, 15);
    }

    #[test]
    fn grants_past_the_maximum_are_rejected() {
        let rich = grant_coins(&ana(), u64::MAX, 1).unwrap();
        assert_eq!(
            grant_coins(&rich, 1, 2).unwrap_err(),
            TransactionError::Overflow("coins")
        );
        assert!(matches!(
            collect_item(&rich, "coin_plaza", 1, 0, 2),
            Err(TransactionError::Overflow(_))
        ));
        assert!(matches!(
            claim_npc_reward(&rich, "lola_nena", 1, 2),
            Err(TransactionError::Overflow(_))
        ));
        // Zero-value grants still fit.
        assert_eq!(grant_coins(&rich, 0, 2).unwrap().coins, u64::MAX);
    }

    #[test]
    fn score_overflow_rejects_mission_completion() {
        let mut p = ana();
        p.total_score = u64::MAX - 10;
        assert_eq!(
            complete_mission(&p, 1, &QuizResult::passed(1, 5.0, 50), 1).unwrap_err(),
            TransactionError::Overflow("total_score")
        );
        let (p, _) = collect_item(&ana(), "pearl", 0, u64::MAX, 1).unwrap();
        assert!(matches!(
            collect_item(&p, "totem", 0, 1, 2),
            Err(TransactionError::Overflow("total_score"))
        ));
    }

    #[test]
    fn speed_challenge_scenario() {
        let mut p = ana();
        for t in [5.0, 15.0, 35.0] {
            p = record_speed_challenge(&p, t, 1).0;
        }
        assert_eq!(p.speed_challenges.excellent, 1);
        assert_eq!(p.speed_challenges.great, 1);
        assert_eq!(p.speed_challenges.good, 0);
        assert_eq!(p.fastest_quiz_time, Some(5.0));
    }

    #[test]
    fn speed_challenge_ignores_invalid_samples() {
        let (p, tier) = record_speed_challenge(&ana(), f64::NAN, 1);
        assert!(tier.is_none());
        assert!(p.fastest_quiz_time.is_none());
        assert_eq!(p.speed_challenges.total(), 0);
    }

    #[test]
    fn achievements_claimed_once() {
        let (p, _) = record_speed_challenge(&ana(), 4.0, 1);
        let (p, first) = claim_achievements(&p, 2);
        assert_eq!(
            first,
            vec![Achievement::FirstSprint, Achievement::LightningReflexes]
        );
        let (p2, second) = claim_achievements(&p, 3);
        assert!(second.is_empty());
        assert_eq!(p2, p);
    }

    #[test]
    fn titles_require_badges() {
        let p = ana();
        assert!(matches!(
            equip_title(&p, "Eco-Kabataan"),
            Err(TransactionError::TitleNotEarned(_))
        ));
        let p = pass(&p, 1);
        let p = equip_title(&p, "Eco-Kabataan").unwrap();
        assert_eq!(p.current_title, "Eco-Kabataan");
        assert_eq!(available_titles(&p).len(), 2);
        let p = equip_title(&p, DEFAULT_TITLE).unwrap();
        assert_eq!(p.current_title, DEFAULT_TITLE);
    }

    #[test]
    fn steps_and_playtime_accumulate() {
        let p = record_steps(&ana(), 120);
        let p = record_steps(&p, 30);
        assert_eq!(p.steps_taken, 150);
        let p = add_playtime(&p, 12.5, 9);
        let p = add_playtime(&p, f64::INFINITY, 10);
        assert!((p.playtime_secs - 12.5).abs() < 1e-9);
        assert_eq!(p.last_played_ms, 10);
    }
}
