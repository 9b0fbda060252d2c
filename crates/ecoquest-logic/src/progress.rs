//! The player progress aggregate.
//!
//! [`PlayerProgress`] is plain data. It is only ever changed through the
//! functions in [`crate::transactions`], each of which returns a new
//! snapshot instead of mutating the one it was given.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::achievements::Achievement;
use crate::catalog::{MissionId, STARTING_LEVEL};

/// Title shown before the player equips an earned badge.
pub const DEFAULT_TITLE: &str = "Baguhang Bantay";

/// Speed-challenge bucket counters. Never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedChallengeCounts {
    pub excellent: u32,
    pub great: u32,
    pub good: u32,
}

impl SpeedChallengeCounts {
    pub fn total(&self) -> u32 {
        self.excellent + self.great + self.good
    }
}

/// Complete progression state for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Identity key; also selects the storage record.
    pub player_name: String,
    pub level: u32,
    /// Spendable balance.
    pub coins: u64,
    /// Lifetime coins earned. Spending does not reduce this.
    pub total_coins_earned: u64,
    /// One badge per completed mission, in completion order.
    pub badges: Vec<String>,
    /// Completed missions in completion order (no duplicates).
    pub completed_missions: Vec<MissionId>,
    pub completed_quizzes: BTreeSet<MissionId>,
    pub total_score: u64,
    pub correct_answers: u32,
    pub total_questions: u32,
    /// Unix time of the last mutation, in milliseconds.
    pub last_played_ms: u64,
    pub playtime_secs: f64,
    pub collected_items: BTreeSet<String>,
    pub speed_challenges: SpeedChallengeCounts,
    /// Fastest quiz time observed; `None` until the first sample.
    pub fastest_quiz_time: Option<f64>,
    pub purchased_items: BTreeSet<String>,
    pub npc_rewards_claimed: BTreeSet<String>,
    pub current_title: String,
    pub steps_taken: u64,
    /// Achievements already announced to the player.
    pub claimed_achievements: BTreeSet<Achievement>,
}

impl PlayerProgress {
    /// Fresh progress for a new player.
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            level: STARTING_LEVEL,
            coins: 0,
            total_coins_earned: 0,
            badges: Vec::new(),
            completed_missions: Vec::new(),
            completed_quizzes: BTreeSet::new(),
            total_score: 0,
            correct_answers: 0,
            total_questions: 0,
            last_played_ms: 0,
            playtime_secs: 0.0,
            collected_items: BTreeSet::new(),
            speed_challenges: SpeedChallengeCounts::default(),
            fastest_quiz_time: None,
            purchased_items: BTreeSet::new(),
            npc_rewards_claimed: BTreeSet::new(),
            current_title: DEFAULT_TITLE.to_string(),
            steps_taken: 0,
            claimed_achievements: BTreeSet::new(),
        }
    }

    pub fn is_completed(&self, mission_id: MissionId) -> bool {
        self.completed_missions.contains(&mission_id)
    }

    /// Completed missions as a set, for the resolver.
    pub fn completed_set(&self) -> BTreeSet<MissionId> {
        self.completed_missions.iter().copied().collect()
    }

    pub fn badge_count(&self) -> usize {
        self.badges.len()
    }

    /// Size of the collected-item set.
    pub fn total_items_collected(&self) -> usize {
        self.collected_items.len()
    }

    /// Overall accuracy in percent (0.0 when nothing has been answered).
    pub fn accuracy_percent(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.correct_answers as f64 / self.total_questions as f64 * 100.0
        }
    }
}
