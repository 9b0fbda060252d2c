//! Quiz sessions and scoring.
//!
//! A quiz for mission `N` is a sequence of `N` questions. Each question
//! runs a countdown (60 s by default); running out is scored exactly like
//! a wrong answer. Wrong answers may be retried twice per question, each
//! retry restarting the countdown. A third miss fails the whole session.
//!
//! # Two kinds of points
//!
//! * **Preview points** are computed per answer from the time *remaining*
//!   on the countdown and discounted by the attempt number. They exist only
//!   for immediate feedback and are never persisted.
//! * **Mission points** are computed once when the session ends, from the
//!   whole-session elapsed time averaged per question. They are the only
//!   points handed to [`crate::transactions::complete_mission`].
//!
//! ```
//! use ecoquest_logic::scoring::{Question, QuizConfig, QuizSession, NextStep};
//!
//! let q = Question::new("Which bin takes plastic bottles?", &["Yellow", "Green"], 0);
//! let mut session = QuizSession::start(1, vec![q], QuizConfig::default()).unwrap();
//! session.tick(4.0);
//! let outcome = session.submit(0).unwrap();
//! assert_eq!(outcome.next, NextStep::MissionPassed);
//! let result = session.result().unwrap();
//! assert!(result.is_correct);
//! assert_eq!(result.points, 50); // 20 base + 30 for an excellent pace
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{self, MissionId};

// ============================================================================
// SPEED TIERS
// ============================================================================

/// Elapsed-time tier shared by mission scoring and speed challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedTier {
    /// ≤ 10 s
    Excellent,
    /// ≤ 20 s
    Great,
    /// ≤ 30 s
    Good,
}

impl SpeedTier {
    pub const EXCELLENT_MAX_SECS: f64 = 10.0;
    pub const GREAT_MAX_SECS: f64 = 20.0;
    pub const GOOD_MAX_SECS: f64 = 30.0;

    /// Classify an elapsed time. Slower than 30 s, negative or non-finite
    /// samples fall into no tier.
    pub fn classify(elapsed_secs: f64) -> Option<SpeedTier> {
        if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
            None
        } else if elapsed_secs <= Self::EXCELLENT_MAX_SECS {
            Some(SpeedTier::Excellent)
        } else if elapsed_secs <= Self::GREAT_MAX_SECS {
            Some(SpeedTier::Great)
        } else if elapsed_secs <= Self::GOOD_MAX_SECS {
            Some(SpeedTier::Good)
        } else {
            None
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// A remaining-time bonus tier for preview points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusTier {
    /// Minimum fraction of the time limit still on the clock (inclusive).
    pub min_remaining_fraction: f64,
    pub bonus: u64,
}

/// Mission-point bonus per speed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedBonus {
    pub excellent: u64,
    pub great: u64,
    pub good: u64,
}

impl SpeedBonus {
    pub fn for_tier(&self, tier: Option<SpeedTier>) -> u64 {
        match tier {
            Some(SpeedTier::Excellent) => self.excellent,
            Some(SpeedTier::Great) => self.great,
            Some(SpeedTier::Good) => self.good,
            None => 0,
        }
    }
}

/// Tunables for quiz sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Countdown per question, in seconds.
    pub time_limit_secs: f64,
    /// Retries allowed per question after a wrong answer.
    pub max_retries: u32,
    /// Preview base points for a correct answer.
    pub question_base_points: u64,
    /// Preview bonus tiers, highest threshold first.
    pub bonus_tiers: Vec<BonusTier>,
    /// Credit multiplier by attempt (first attempt, one retry, two retries).
    pub attempt_credit: Vec<f64>,
    /// Mission points awarded for passing, before the speed bonus.
    pub mission_base_points: u64,
    pub speed_bonus: SpeedBonus,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 60.0,
            max_retries: 2,
            question_base_points: 10,
            bonus_tiers: vec![
                BonusTier {
                    min_remaining_fraction: 5.0 / 6.0,
                    bonus: 15,
                },
                BonusTier {
                    min_remaining_fraction: 2.0 / 3.0,
                    bonus: 10,
                },
                BonusTier {
                    min_remaining_fraction: 0.5,
                    bonus: 5,
                },
            ],
            attempt_credit: vec![1.0, 0.5, 0.25],
            mission_base_points: 20,
            speed_bonus: SpeedBonus {
                excellent: 30,
                great: 20,
                good: 10,
            },
        }
    }
}

/// Preview bonus for answering with `remaining_secs` left on the clock.
///
/// Tiers are checked highest first, so a value sitting exactly on a
/// threshold gets the higher tier.
pub fn time_bonus(remaining_secs: f64, config: &QuizConfig) -> u64 {
    if config.time_limit_secs <= 0.0 || !remaining_secs.is_finite() {
        return 0;
    }
    let fraction = remaining_secs / config.time_limit_secs;
    config
        .bonus_tiers
        .iter()
        .find(|t| fraction >= t.min_remaining_fraction)
        .map(|t| t.bonus)
        .unwrap_or(0)
}

/// Credit multiplier for an answer given after `retries` retries.
pub fn attempt_credit(retries: u32, config: &QuizConfig) -> f64 {
    let idx = retries as usize;
    config
        .attempt_credit
        .get(idx)
        .or_else(|| config.attempt_credit.last())
        .copied()
        .unwrap_or(0.0)
}

/// Feedback points for a correct answer (never persisted).
pub fn preview_points(remaining_secs: f64, retries: u32, config: &QuizConfig) -> u64 {
    let raw = (config.question_base_points + time_bonus(remaining_secs, config)) as f64;
    (raw * attempt_credit(retries, config)).floor() as u64
}

/// Authoritative points for a passed session.
///
/// The session's elapsed time is averaged over its questions before being
/// classified, so longer missions are not penalised for their length.
pub fn mission_points(elapsed_secs: f64, question_count: usize, config: &QuizConfig) -> u64 {
    let per_question = elapsed_secs / question_count.max(1) as f64;
    config.mission_base_points + config.speed_bonus.for_tier(SpeedTier::classify(per_question))
}

/// Number of questions in the quiz for `mission_id`.
pub fn question_count(mission_id: MissionId) -> usize {
    mission_id as usize
}

// ============================================================================
// QUESTIONS & RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl Question {
    pub fn new(prompt: &str, options: &[&str], correct_index: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index,
        }
    }
}

/// Mission-level outcome of a quiz, consumed by the transaction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub mission_id: MissionId,
    /// Final answer given; `None` if the final attempt timed out.
    pub selected_option: Option<usize>,
    pub correct_option: usize,
    pub is_correct: bool,
    /// Time since the quiz started.
    pub elapsed_secs: f64,
    /// Mission points; zero when incorrect.
    pub points: u64,
}

impl QuizResult {
    /// A passing result with the given points.
    pub fn passed(mission_id: MissionId, elapsed_secs: f64, points: u64) -> Self {
        Self {
            mission_id,
            selected_option: Some(0),
            correct_option: 0,
            is_correct: true,
            elapsed_secs,
            points,
        }
    }

    /// A failing result.
    pub fn failed(mission_id: MissionId, elapsed_secs: f64) -> Self {
        Self {
            mission_id,
            selected_option: Some(1),
            correct_option: 0,
            is_correct: false,
            elapsed_secs,
            points: 0,
        }
    }
}

/// What the session does after an answered attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStep {
    /// Same question again, fresh countdown.
    Retry,
    NextQuestion,
    MissionPassed,
    /// Retry cap exceeded; the quiz must restart from the first question.
    MissionFailed,
}

impl NextStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NextStep::MissionPassed | NextStep::MissionFailed)
    }
}

/// Per-attempt feedback for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_index: usize,
    /// 1 for the first attempt, 2 after one retry, ...
    pub attempt: u32,
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    pub timed_out: bool,
    pub remaining_secs: f64,
    /// Feedback only; see the module docs.
    pub preview_points: u64,
    pub next: NextStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("mission {0} is not in the catalog")]
    UnknownMission(MissionId),
    #[error("mission quiz needs {expected} questions, got {found}")]
    QuestionCountMismatch { expected: usize, found: usize },
    #[error("question {0} has no options or an out-of-range answer")]
    InvalidQuestion(usize),
    #[error("option {selected} does not exist (question has {available})")]
    InvalidOption { selected: usize, available: usize },
    #[error("this attempt has already been scored")]
    AlreadyResolved,
    #[error("no scored attempt is waiting to advance")]
    NothingToAdvance,
    #[error("quiz session is closed")]
    SessionClosed,
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    /// Countdown running; the current attempt has not been scored.
    Answering,
    /// Current attempt scored; waiting for `advance`.
    Feedback(NextStep),
    Passed,
    Failed,
    Abandoned,
}

/// A running quiz for one mission.
#[derive(Debug, Clone)]
pub struct QuizSession {
    mission_id: MissionId,
    questions: Vec<Question>,
    config: QuizConfig,
    current: usize,
    retries: u32,
    remaining_secs: f64,
    elapsed_secs: f64,
    phase: Phase,
    last_selected: Option<usize>,
}

impl QuizSession {
    /// Start a session at question 1 with a full countdown.
    pub fn start(
        mission_id: MissionId,
        questions: Vec<Question>,
        config: QuizConfig,
    ) -> Result<Self, QuizError> {
        if catalog::mission(mission_id).is_none() {
            return Err(QuizError::UnknownMission(mission_id));
        }
        let expected = question_count(mission_id);
        if questions.len() != expected {
            return Err(QuizError::QuestionCountMismatch {
                expected,
                found: questions.len(),
            });
        }
        if let Some(bad) = questions
            .iter()
            .position(|q| q.options.is_empty() || q.correct_index >= q.options.len())
        {
            return Err(QuizError::InvalidQuestion(bad));
        }

        let remaining_secs = config.time_limit_secs;
        Ok(Self {
            mission_id,
            questions,
            config,
            current: 0,
            retries: 0,
            remaining_secs,
            elapsed_secs: 0.0,
            phase: Phase::Answering,
            last_selected: None,
        })
    }

    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Answering | Phase::Feedback(_) => self.questions.get(self.current),
            _ => None,
        }
    }

    pub fn question_index(&self) -> usize {
        self.current
    }

    pub fn retries_used(&self) -> u32 {
        self.retries
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// True while the countdown is running for an unscored attempt.
    pub fn is_awaiting_answer(&self) -> bool {
        self.phase == Phase::Answering
    }

    /// True once the session passed, failed or was abandoned.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Passed | Phase::Failed | Phase::Abandoned)
    }

    pub fn is_abandoned(&self) -> bool {
        self.phase == Phase::Abandoned
    }

    /// Advance the clocks by `dt` seconds.
    ///
    /// Returns the timeout outcome if the countdown reached zero during
    /// this tick. Ticks on a finished session do nothing.
    pub fn tick(&mut self, dt: f64) -> Option<QuestionOutcome> {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        match self.phase {
            Phase::Answering => {
                self.elapsed_secs += dt;
                self.remaining_secs -= dt;
                if self.remaining_secs <= 0.0 {
                    self.remaining_secs = 0.0;
                    Some(self.resolve(None))
                } else {
                    None
                }
            }
            Phase::Feedback(_) => {
                self.elapsed_secs += dt;
                None
            }
            Phase::Passed | Phase::Failed | Phase::Abandoned => None,
        }
    }

    /// Score the current attempt with the player's choice.
    pub fn submit(&mut self, selected: usize) -> Result<QuestionOutcome, QuizError> {
        match self.phase {
            Phase::Answering => {}
            Phase::Feedback(_) | Phase::Passed | Phase::Failed => {
                return Err(QuizError::AlreadyResolved)
            }
            Phase::Abandoned => return Err(QuizError::SessionClosed),
        }
        let available = self.questions[self.current].options.len();
        if selected >= available {
            return Err(QuizError::InvalidOption {
                selected,
                available,
            });
        }
        Ok(self.resolve(Some(selected)))
    }

    /// Move past a scored attempt: retry, or go to the next question.
    pub fn advance(&mut self) -> Result<NextStep, QuizError> {
        let step = match self.phase {
            Phase::Feedback(step) => step,
            Phase::Abandoned | Phase::Passed | Phase::Failed => {
                return Err(QuizError::SessionClosed)
            }
            Phase::Answering => return Err(QuizError::NothingToAdvance),
        };
        match step {
            NextStep::Retry => self.retries += 1,
            NextStep::NextQuestion => {
                self.current += 1;
                self.retries = 0;
            }
            // Terminal steps never park in Feedback.
            NextStep::MissionPassed | NextStep::MissionFailed => {}
        }
        self.remaining_secs = self.config.time_limit_secs;
        self.phase = Phase::Answering;
        Ok(step)
    }

    /// Close the session without a result. The countdown stops for good.
    pub fn abandon(&mut self) {
        if !matches!(self.phase, Phase::Passed | Phase::Failed) {
            self.phase = Phase::Abandoned;
        }
    }

    /// Mission-level result once the session has passed or failed.
    pub fn result(&self) -> Option<QuizResult> {
        let is_correct = match self.phase {
            Phase::Passed => true,
            Phase::Failed => false,
            _ => return None,
        };
        let points = if is_correct {
            mission_points(self.elapsed_secs, self.questions.len(), &self.config)
        } else {
            0
        };
        Some(QuizResult {
            mission_id: self.mission_id,
            selected_option: self.last_selected,
            correct_option: self.questions[self.current].correct_index,
            is_correct,
            elapsed_secs: self.elapsed_secs,
            points,
        })
    }

    fn resolve(&mut self, selected: Option<usize>) -> QuestionOutcome {
        let correct_index = self.questions[self.current].correct_index;
        let is_correct = selected == Some(correct_index);
        let timed_out = selected.is_none();

        let next = if is_correct {
            if self.current + 1 == self.questions.len() {
                NextStep::MissionPassed
            } else {
                NextStep::NextQuestion
            }
        } else if self.retries < self.config.max_retries {
            NextStep::Retry
        } else {
            NextStep::MissionFailed
        };

        let preview = if is_correct {
            preview_points(self.remaining_secs, self.retries, &self.config)
        } else {
            0
        };

        self.last_selected = selected;
        self.phase = match next {
            NextStep::MissionPassed => Phase::Passed,
            NextStep::MissionFailed => Phase::Failed,
            other => Phase::Feedback(other),
        };

        QuestionOutcome {
            question_index: self.current,
            attempt: self.retries + 1,
            selected,
            correct_index,
            is_correct,
            timed_out,
            remaining_secs: self.remaining_secs,
            preview_points: preview,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question::new(&format!("Q{}", i + 1), &["a", "b", "c", "d"], i % 4))
            .collect()
    }

    fn session(mission: MissionId) -> QuizSession {
        QuizSession::start(mission, questions(mission as usize), QuizConfig::default()).unwrap()
    }

    #[test]
    fn speed_tier_boundaries() {
        assert_eq!(SpeedTier::classify(0.0), Some(SpeedTier::Excellent));
        assert_eq!(SpeedTier::classify(10.0), Some(SpeedTier::Excellent));
        assert_eq!(SpeedTier::classify(10.01), Some(SpeedTier::Great));
        assert_eq!(SpeedTier::classify(20.0), Some(SpeedTier::Great));
        assert_eq!(SpeedTier::classify(30.0), Some(SpeedTier::Good));
        assert_eq!(SpeedTier::classify(30.5), None);
        assert_eq!(SpeedTier::classify(f64::NAN), None);
        assert_eq!(SpeedTier::classify(-1.0), None);
    }

    #[test]
    fn time_bonus_tiers_resolve_ties_upward() {
        let c = QuizConfig::default();
        assert_eq!(time_bonus(60.0, &c), 15);
        assert_eq!(time_bonus(50.0, &c), 15);
        assert_eq!(time_bonus(49.0, &c), 10);
        assert_eq!(time_bonus(40.0, &c), 10);
        assert_eq!(time_bonus(30.0, &c), 5);
        assert_eq!(time_bonus(29.9, &c), 0);
        assert_eq!(time_bonus(0.0, &c), 0);
    }

    #[test]
    fn preview_points_discounted_by_attempt() {
        let c = QuizConfig::default();
        assert_eq!(preview_points(55.0, 0, &c), 25);
        assert_eq!(preview_points(55.0, 1, &c), 12);
        assert_eq!(preview_points(55.0, 2, &c), 6);
        // Beyond the table the last factor applies.
        assert_eq!(preview_points(55.0, 7, &c), 6);
    }

    #[test]
    fn mission_points_average_per_question() {
        let c = QuizConfig::default();
        assert_eq!(mission_points(8.0, 1, &c), 50);
        assert_eq!(mission_points(45.0, 3, &c), 40); // 15 s per question
        assert_eq!(mission_points(90.0, 3, &c), 30);
        assert_eq!(mission_points(200.0, 2, &c), 20);
    }

    #[test]
    fn start_validates_question_count() {
        let err = QuizSession::start(3, questions(2), QuizConfig::default()).unwrap_err();
        assert_eq!(
            err,
            QuizError::QuestionCountMismatch {
                expected: 3,
                found: 2
            }
        );
        let err = QuizSession::start(42, questions(42), QuizConfig::default()).unwrap_err();
        assert_eq!(err, QuizError::UnknownMission(42));
    }

    #[test]
    fn start_rejects_bad_question() {
        let mut qs = questions(2);
        qs[1].correct_index = 9;
        let err = QuizSession::start(2, qs, QuizConfig::default()).unwrap_err();
        assert_eq!(err, QuizError::InvalidQuestion(1));
    }

    #[test]
    fn full_pass_walks_every_question() {
        let mut s = session(3);
        for i in 0..3 {
            s.tick(2.0);
            let out = s.submit(i % 4).unwrap();
            assert!(out.is_correct);
            if i < 2 {
                assert_eq!(out.next, NextStep::NextQuestion);
                assert_eq!(s.advance().unwrap(), NextStep::NextQuestion);
            } else {
                assert_eq!(out.next, NextStep::MissionPassed);
            }
        }
        let r = s.result().unwrap();
        assert!(r.is_correct);
        assert_eq!(r.mission_id, 3);
        assert_eq!(r.selected_option, Some(2));
        assert_eq!(r.correct_option, 2);
        assert_eq!(r.points, 50);
        assert!((r.elapsed_secs - 6.0).abs() < 1e-9);
    }

    #[test]
    fn latch_rejects_second_submission() {
        let mut s = session(2);
        s.submit(1).unwrap();
        assert_eq!(s.submit(0).unwrap_err(), QuizError::AlreadyResolved);
    }

    #[test]
    fn timeout_after_manual_submit_is_ignored() {
        let mut s = session(2);
        let out = s.submit(0).unwrap();
        assert_eq!(out.next, NextStep::NextQuestion);
        // The countdown would have expired in the same tick window.
        assert!(s.tick(120.0).is_none());
        assert_eq!(s.question_index(), 0);
    }

    #[test]
    fn timeout_counts_as_wrong_answer() {
        let mut s = session(1);
        let out = s.tick(60.0).unwrap();
        assert!(!out.is_correct);
        assert!(out.timed_out);
        assert_eq!(out.preview_points, 0);
        assert_eq!(out.next, NextStep::Retry);
        assert_eq!(s.submit(0).unwrap_err(), QuizError::AlreadyResolved);
    }

    #[test]
    fn retry_resets_timer_and_discounts() {
        let mut s = session(1);
        s.tick(30.0);
        s.submit(3).unwrap();
        assert_eq!(s.advance().unwrap(), NextStep::Retry);
        assert_eq!(s.remaining_secs(), 60.0);
        let out = s.submit(0).unwrap();
        assert_eq!(out.attempt, 2);
        assert_eq!(out.preview_points, 12);
        assert_eq!(out.next, NextStep::MissionPassed);
    }

    #[test]
    fn exceeding_retry_cap_fails_mission() {
        let mut s = session(2);
        for attempt in 0..3 {
            let out = s.submit(3).unwrap();
            if attempt < 2 {
                assert_eq!(out.next, NextStep::Retry);
                s.advance().unwrap();
            } else {
                assert_eq!(out.next, NextStep::MissionFailed);
            }
        }
        let r = s.result().unwrap();
        assert!(!r.is_correct);
        assert_eq!(r.points, 0);
        assert_eq!(s.advance().unwrap_err(), QuizError::SessionClosed);
    }

    #[test]
    fn abandon_releases_timer() {
        let mut s = session(2);
        s.tick(5.0);
        s.abandon();
        assert!(s.tick(100.0).is_none());
        assert_eq!(s.submit(0).unwrap_err(), QuizError::SessionClosed);
        assert!(s.result().is_none());
        assert!(s.is_abandoned());
    }

    #[test]
    fn advance_requires_scored_attempt() {
        let mut s = session(1);
        assert_eq!(s.advance().unwrap_err(), QuizError::NothingToAdvance);
    }

    #[test]
    fn invalid_option_does_not_consume_attempt() {
        let mut s = session(1);
        let err = s.submit(4).unwrap_err();
        assert_eq!(
            err,
            QuizError::InvalidOption {
                selected: 4,
                available: 4
            }
        );
        assert!(s.is_awaiting_answer());
    }
}
