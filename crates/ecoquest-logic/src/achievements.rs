//! Speed achievements.
//!
//! Achievements are a pure function of the speed-challenge counters and
//! the fastest recorded quiz time. [`check_achievements`] recomputes the
//! full earned set on every call; [`crate::transactions::claim_achievements`]
//! records which of them have already been announced so that the
//! presentation layer only hears about each one once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::progress::PlayerProgress;

/// Bucket count needed for the single-tier achievements.
const TIER_TARGET: u32 = 5;

/// Per-tier count needed for [`Achievement::SpeedMaster`].
const MASTER_TARGET: u32 = 3;

/// Fastest time (seconds) needed for [`Achievement::LightningReflexes`].
const LIGHTNING_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Achievement {
    /// First excellent-tier finish.
    FirstSprint,
    /// Five excellent-tier finishes.
    SpeedDemon,
    /// Five great-tier finishes.
    QuickThinker,
    /// Five good-tier finishes.
    SteadyPace,
    /// A quiz finished in five seconds or less.
    LightningReflexes,
    /// Three finishes in every tier.
    SpeedMaster,
}

impl Achievement {
    pub const ALL: [Achievement; 6] = [
        Achievement::FirstSprint,
        Achievement::SpeedDemon,
        Achievement::QuickThinker,
        Achievement::SteadyPace,
        Achievement::LightningReflexes,
        Achievement::SpeedMaster,
    ];

    /// Name shown in notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            Achievement::FirstSprint => "First Sprint",
            Achievement::SpeedDemon => "Speed Demon",
            Achievement::QuickThinker => "Quick Thinker",
            Achievement::SteadyPace => "Steady Pace",
            Achievement::LightningReflexes => "Lightning Reflexes",
            Achievement::SpeedMaster => "Speed Master",
        }
    }
}

/// Every achievement the progress currently qualifies for.
pub fn check_achievements(progress: &PlayerProgress) -> BTreeSet<Achievement> {
    let s = &progress.speed_challenges;
    let mut earned = BTreeSet::new();

    if s.excellent >= 1 {
        earned.insert(Achievement::FirstSprint);
    }
    if s.excellent >= TIER_TARGET {
        earned.insert(Achievement::SpeedDemon);
    }
    if s.great >= TIER_TARGET {
        earned.insert(Achievement::QuickThinker);
    }
    if s.good >= TIER_TARGET {
        earned.insert(Achievement::SteadyPace);
    }
    if matches!(progress.fastest_quiz_time, Some(t) if t <= LIGHTNING_SECS) {
        earned.insert(Achievement::LightningReflexes);
    }
    if s.excellent >= MASTER_TARGET && s.great >= MASTER_TARGET && s.good >= MASTER_TARGET {
        earned.insert(Achievement::SpeedMaster);
    }

    earned
}

/// Earned achievements not yet claimed.
pub fn unclaimed_achievements(progress: &PlayerProgress) -> BTreeSet<Achievement> {
    check_achievements(progress)
        .difference(&progress.claimed_achievements)
        .copied()
        .collect()
}
