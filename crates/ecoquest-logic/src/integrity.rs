//! Tamper evidence and structural invariants for progress snapshots.
//!
//! The checksum covers a small, stable subset of fields (player name, coin
//! balance, badge count, total score). It catches accidental corruption and
//! casual hand edits of a save blob; it is not a security boundary, since
//! anyone with the client can recompute it.
//!
//! Structural validation re-derives what it can from the catalog and
//! reports every invariant that does not hold.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::achievements::check_achievements;
use crate::catalog::{self, MissionId, MAX_LEVEL, STARTING_LEVEL};
use crate::progress::{PlayerProgress, DEFAULT_TITLE};

/// Checksum token stored next to a serialized snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(pub u64);

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// SHA-256 over the checksummed fields, truncated to 64 bits.
pub fn compute_checksum(progress: &PlayerProgress) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update((progress.player_name.len() as u64).to_le_bytes());
    hasher.update(progress.player_name.as_bytes());
    hasher.update(progress.coins.to_le_bytes());
    hasher.update((progress.badges.len() as u64).to_le_bytes());
    hasher.update(progress.total_score.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    Checksum(u64::from_le_bytes(bytes))
}

pub fn verify_checksum(progress: &PlayerProgress, expected: Checksum) -> bool {
    compute_checksum(progress) == expected
}

/// A broken structural invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntegrityViolation {
    UnknownMission(MissionId),
    DuplicateMission(MissionId),
    /// Badge list differs from the one derived from completed missions.
    BadgeMismatch { expected: Vec<String>, found: Vec<String> },
    /// A mission appears before one of its prerequisites.
    PrerequisiteOrder { mission: MissionId, missing: MissionId },
    QuizNotRecorded(MissionId),
    CorrectExceedsTotal { correct: u32, total: u32 },
    /// Fewer correct answers than completed missions.
    CorrectBelowCompletions { correct: u32, completed: usize },
    EarnedBelowMissionRewards { earned: u64, floor: u64 },
    ScoreBelowMissionRewards { score: u64, floor: u64 },
    LevelOutOfRange(u32),
    /// Level is above what the badge count allows.
    LevelNotEarned { level: u32, badges: usize, required: usize },
    UnearnedAchievementClaimed(String),
    TitleNotEarned(String),
    InvalidPlaytime,
    InvalidFastestTime,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMission(id) => write!(f, "unknown mission {}", id),
            Self::DuplicateMission(id) => write!(f, "mission {} completed twice", id),
            Self::BadgeMismatch { expected, found } => write!(
                f,
                "badge list mismatch: expected {} badges, found {}",
                expected.len(),
                found.len()
            ),
            Self::PrerequisiteOrder { mission, missing } => write!(
                f,
                "mission {} completed before prerequisite {}",
                mission, missing
            ),
            Self::QuizNotRecorded(id) => write!(f, "mission {} has no completed quiz", id),
            Self::CorrectExceedsTotal { correct, total } => {
                write!(f, "{} correct answers out of {} questions", correct, total)
            }
            Self::CorrectBelowCompletions { correct, completed } => write!(
                f,
                "{} correct answers for {} completed missions",
                correct, completed
            ),
            Self::EarnedBelowMissionRewards { earned, floor } => write!(
                f,
                "lifetime coins {} below mission rewards {}",
                earned, floor
            ),
            Self::ScoreBelowMissionRewards { score, floor } => {
                write!(f, "score {} below mission rewards {}", score, floor)
            }
            Self::LevelOutOfRange(level) => write!(f, "level {} out of range", level),
            Self::LevelNotEarned {
                level,
                badges,
                required,
            } => write!(
                f,
                "level {} needs {} badges, found {}",
                level, required, badges
            ),
            Self::UnearnedAchievementClaimed(name) => {
                write!(f, "achievement {} claimed but not earned", name)
            }
            Self::TitleNotEarned(title) => write!(f, "title {:?} not earned", title),
            Self::InvalidPlaytime => write!(f, "playtime is negative or not finite"),
            Self::InvalidFastestTime => write!(f, "fastest quiz time is negative or not finite"),
        }
    }
}

/// Check every structural invariant. An empty list means valid.
pub fn validate_structure(progress: &PlayerProgress) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    let mut seen: BTreeSet<MissionId> = BTreeSet::new();
    let mut expected_badges = Vec::with_capacity(progress.completed_missions.len());
    let mut coin_floor = 0u64;
    let mut score_floor = 0u64;

    for &id in &progress.completed_missions {
        let Some(def) = catalog::mission(id) else {
            violations.push(IntegrityViolation::UnknownMission(id));
            continue;
        };
        if !seen.insert(id) {
            violations.push(IntegrityViolation::DuplicateMission(id));
            continue;
        }
        // Prerequisites must already be in the completed prefix.
        for &pre in def.prerequisites {
            if !seen.contains(&pre) || pre == id {
                violations.push(IntegrityViolation::PrerequisiteOrder {
                    mission: id,
                    missing: pre,
                });
            }
        }
        if !progress.completed_quizzes.contains(&id) {
            violations.push(IntegrityViolation::QuizNotRecorded(id));
        }
        expected_badges.push(def.badge_name.to_string());
        coin_floor += def.coin_reward;
        score_floor += def.point_reward;
    }

    if expected_badges != progress.badges {
        violations.push(IntegrityViolation::BadgeMismatch {
            expected: expected_badges,
            found: progress.badges.clone(),
        });
    }

    if progress.correct_answers > progress.total_questions {
        violations.push(IntegrityViolation::CorrectExceedsTotal {
            correct: progress.correct_answers,
            total: progress.total_questions,
        });
    }
    if (progress.correct_answers as usize) < seen.len() {
        violations.push(IntegrityViolation::CorrectBelowCompletions {
            correct: progress.correct_answers,
            completed: seen.len(),
        });
    }

    // Spending lowers the balance, so the floor applies to lifetime earnings.
    if progress.total_coins_earned < coin_floor {
        violations.push(IntegrityViolation::EarnedBelowMissionRewards {
            earned: progress.total_coins_earned,
            floor: coin_floor,
        });
    }
    if progress.total_score < score_floor {
        violations.push(IntegrityViolation::ScoreBelowMissionRewards {
            score: progress.total_score,
            floor: score_floor,
        });
    }

    if !(STARTING_LEVEL..=MAX_LEVEL).contains(&progress.level) {
        violations.push(IntegrityViolation::LevelOutOfRange(progress.level));
    }
    // Accuracy can drop after a level-up, so only the badge gate is re-checked.
    for passed in STARTING_LEVEL..progress.level.min(MAX_LEVEL) {
        let Some(req) = catalog::level_requirement(passed) else {
            continue;
        };
        if progress.badges.len() < req.badges_required {
            violations.push(IntegrityViolation::LevelNotEarned {
                level: progress.level,
                badges: progress.badges.len(),
                required: req.badges_required,
            });
            break;
        }
    }

    let earned = check_achievements(progress);
    for claimed in progress.claimed_achievements.difference(&earned) {
        violations.push(IntegrityViolation::UnearnedAchievementClaimed(
            claimed.display_name().to_string(),
        ));
    }

    if progress.current_title != DEFAULT_TITLE
        && !progress.badges.iter().any(|b| *b == progress.current_title)
    {
        violations.push(IntegrityViolation::TitleNotEarned(
            progress.current_title.clone(),
        ));
    }

    if !progress.playtime_secs.is_finite() || progress.playtime_secs < 0.0 {
        violations.push(IntegrityViolation::InvalidPlaytime);
    }
    if let Some(t) = progress.fastest_quiz_time {
        if !t.is_finite() || t < 0.0 {
            violations.push(IntegrityViolation::InvalidFastestTime);
        }
    }

    violations
}

pub fn is_structurally_valid(progress: &PlayerProgress) -> bool {
    validate_structure(progress).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::QuizResult;
    use crate::transactions::{complete_mission, spend_coins};

    fn played() -> PlayerProgress {
        let mut p = PlayerProgress::new("Ana");
        for id in 1..=4 {
            p = complete_mission(&p, id, &QuizResult::passed(id, 9.0, 50), 1)
                .unwrap()
                .0;
        }
        p
    }

    #[test]
    fn checksum_is_deterministic() {
        let p = played();
        assert_eq!(compute_checksum(&p), compute_checksum(&p.clone()));
        assert_eq!(compute_checksum(&p).to_string().len(), 16);
    }

    #[test]
    fn checksum_tracks_covered_fields() {
        let p = played();
        let base = compute_checksum(&p);

        let mut coins = p.clone();
        coins.coins += 1;
        assert_ne!(compute_checksum(&coins), base);

        let mut score = p.clone();
        score.total_score += 1;
        assert_ne!(compute_checksum(&score), base);

        let mut name = p.clone();
        name.player_name.push('!');
        assert_ne!(compute_checksum(&name), base);

        let mut steps = p.clone();
        steps.steps_taken += 10;
        assert_eq!(compute_checksum(&steps), base);
    }

    #[test]
    fn played_progress_is_valid() {
        assert!(validate_structure(&played()).is_empty());
        assert!(is_structurally_valid(&PlayerProgress::new("Ana")));
    }

    #[test]
    fn spending_keeps_structure_valid() {
        let p = spend_coins(&played(), 100, 1).unwrap();
        assert!(is_structurally_valid(&p));
    }

    #[test]
    fn detects_unearned_level() {
        let mut p = PlayerProgress::new("Ana");
        let base = compute_checksum(&p);
        p.level = 2;
        assert_eq!(compute_checksum(&p), base);
        assert_eq!(
            validate_structure(&p),
            vec![IntegrityViolation::LevelNotEarned {
                level: 2,
                badges: 0,
                required: 10
            }]
        );

        let mut p = played();
        p.level = 2;
        assert!(!is_structurally_valid(&p));
    }

    #[test]
    fn earned_level_stays_valid_after_accuracy_drops() {
        let mut p = PlayerProgress::new("Ana");
        for id in 1..=10 {
            p = complete_mission(&p, id, &QuizResult::passed(id, 9.0, 50), 1)
                .unwrap()
                .0;
        }
        assert_eq!(p.level, 2);
        p.total_questions += 40;
        assert!(validate_structure(&p).is_empty());
    }

    #[test]
    fn detects_forged_badge() {
        let mut p = played();
        p.badges.push("Bayani ng Daigdig".into());
        assert!(matches!(
            validate_structure(&p).as_slice(),
            [IntegrityViolation::BadgeMismatch { .. }]
        ));
    }

    #[test]
    fn detects_out_of_order_completion() {
        let mut p = played();
        p.completed_missions.swap(0, 1);
        p.badges.swap(0, 1);
        let v = validate_structure(&p);
        assert!(v.contains(&IntegrityViolation::PrerequisiteOrder {
            mission: 2,
            missing: 1
        }));
    }

    #[test]
    fn detects_accuracy_tampering() {
        let mut p = played();
        p.correct_answers = p.total_questions + 1;
        assert!(validate_structure(&p)
            .iter()
            .any(|v| matches!(v, IntegrityViolation::CorrectExceedsTotal { .. })));
    }

    #[test]
    fn detects_unearned_rewards() {
        let mut p = played();
        p.total_coins_earned = 10;
        p.total_score = 0;
        let v = validate_structure(&p);
        assert!(v
            .iter()
            .any(|x| matches!(x, IntegrityViolation::EarnedBelowMissionRewards { .. })));
        assert!(v
            .iter()
            .any(|x| matches!(x, IntegrityViolation::ScoreBelowMissionRewards { .. })));
    }

    #[test]
    fn detects_unknown_and_duplicate_missions() {
        let mut p = played();
        p.completed_missions.push(99);
        p.completed_missions.push(1);
        let v = validate_structure(&p);
        assert!(v.contains(&IntegrityViolation::UnknownMission(99)));
        assert!(v.contains(&IntegrityViolation::DuplicateMission(1)));
    }

    #[test]
    fn detects_bad_level_and_title() {
        let mut p = played();
        p.level = 7;
        p.current_title = "Hari ng Lahat".into();
        let v = validate_structure(&p);
        assert!(v.contains(&IntegrityViolation::LevelOutOfRange(7)));
        assert!(v.contains(&IntegrityViolation::TitleNotEarned("Hari ng Lahat".into())));
    }

    #[test]
    fn detects_claimed_but_unearned_achievement() {
        let mut p = played();
        p.claimed_achievements
            .insert(crate::achievements::Achievement::SpeedMaster);
        assert_eq!(
            validate_structure(&p),
            vec![IntegrityViolation::UnearnedAchievementClaimed(
                "Speed Master".into()
            )]
        );
    }
}
