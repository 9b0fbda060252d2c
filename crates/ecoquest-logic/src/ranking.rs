//! Sanitized, read-only projection of progress for the ranking service.

use serde::{Deserialize, Serialize};

use crate::progress::PlayerProgress;

/// What the leaderboard receives. Every number is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub player_name: String,
    pub level: u32,
    pub total_score: u64,
    pub badge_count: u64,
    pub coins: u64,
    pub completed_missions: u64,
    /// Percent, rounded to two decimals.
    pub accuracy: f64,
    /// Whole seconds.
    pub playtime_secs: u64,
    /// `None` when no quiz has been timed yet.
    pub fastest_quiz_time: Option<f64>,
    pub excellent_count: u32,
    pub great_count: u32,
    pub good_count: u32,
    pub total_collectibles: u64,
}

impl RankingEntry {
    pub fn from_progress(progress: &PlayerProgress) -> Self {
        Self {
            player_name: progress.player_name.clone(),
            level: progress.level,
            total_score: progress.total_score,
            badge_count: progress.badge_count() as u64,
            coins: progress.coins,
            completed_missions: progress.completed_missions.len() as u64,
            accuracy: round2(sanitize_f64(progress.accuracy_percent())),
            playtime_secs: sanitize_count(progress.playtime_secs),
            fastest_quiz_time: sanitize_optional(progress.fastest_quiz_time),
            excellent_count: progress.speed_challenges.excellent,
            great_count: progress.speed_challenges.great,
            good_count: progress.speed_challenges.good,
            total_collectibles: progress.total_items_collected() as u64,
        }
    }
}

/// NaN and infinities become zero.
pub fn sanitize_f64(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Finite, non-negative values rounded to the nearest integer; anything
/// else becomes zero.
pub fn sanitize_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Optional measurements become absent when they are not finite.
pub fn sanitize_optional(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Remote records are only replaced by a strictly higher score.
pub fn should_replace(new_score: u64, previous: Option<u64>) -> bool {
    match previous {
        Some(prev) => new_score > prev,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_rounded_to_two_decimals() {
        let mut p = PlayerProgress::new("Ana");
        p.correct_answers = 2;
        p.total_questions = 3;
        let e = RankingEntry::from_progress(&p);
        assert_eq!(e.accuracy, 66.67);
    }

    #[test]
    fn non_finite_values_are_sanitized() {
        let mut p = PlayerProgress::new("Ana");
        p.playtime_secs = f64::NAN;
        p.fastest_quiz_time = Some(f64::INFINITY);
        let e = RankingEntry::from_progress(&p);
        assert_eq!(e.playtime_secs, 0);
        assert_eq!(e.fastest_quiz_time, None);
        assert_eq!(e.accuracy, 0.0);
    }

    #[test]
    fn playtime_rounds_to_whole_seconds() {
        let mut p = PlayerProgress::new("Ana");
        p.playtime_secs = 125.6;
        p.collected_items.insert("coin_plaza".into());
        let e = RankingEntry::from_progress(&p);
        assert_eq!(e.playtime_secs, 126);
        assert_eq!(e.total_collectibles, 1);
    }

    #[test]
    fn replace_only_when_strictly_higher() {
        assert!(should_replace(10, None));
        assert!(should_replace(11, Some(10)));
        assert!(!should_replace(10, Some(10)));
        assert!(!should_replace(9, Some(10)));
    }

    #[test]
    fn helpers() {
        assert_eq!(sanitize_f64(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_count(-4.0), 0);
        assert_eq!(sanitize_count(2.5), 3);
        assert_eq!(sanitize_optional(Some(3.0)), Some(3.0));
        assert_eq!(sanitize_optional(Some(f64::NAN)), None);
    }
}
