//! Typed messages between the progress store and the rest of the game.
//!
//! [`ProgressEvent`]s flow out of the store to subscribers (HUD, world
//! indicators, notifications). [`GameInput`]s flow in from the world and
//! the quiz dialog. Each variant carries only what its consumer needs.

use std::sync::mpsc::{Receiver, TryIter};
use std::sync::Arc;

use ecoquest_logic::achievements::Achievement;
use ecoquest_logic::catalog::MissionId;
use ecoquest_logic::integrity::IntegrityViolation;
use ecoquest_logic::progress::PlayerProgress;
use ecoquest_logic::resolver::MissionState;
use ecoquest_logic::scoring::{Question, QuestionOutcome};

/// Indicator state for one mission trigger in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionStatus {
    pub mission_id: MissionId,
    pub state: MissionState,
}

/// Notifications produced by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A transaction finished; this is the snapshot after it.
    ProgressChanged(Arc<PlayerProgress>),
    /// Accessible/locked/completed state of every mission.
    MissionStates(Vec<MissionStatus>),
    LevelUp { level: u32 },
    AchievementUnlocked(Vec<Achievement>),
    ItemCollected { item_id: String, granted: bool },
    /// Per-answer feedback from the running quiz.
    QuizFeedback(QuestionOutcome),
    /// The quiz ended; `passed` is false when the retry cap was exceeded.
    QuizFinished { mission_id: MissionId, passed: bool },
    /// The live snapshot failed a periodic structure check.
    IntegrityWarning(Vec<IntegrityViolation>),
    /// The snapshot could not be written; it remains authoritative in memory.
    PersistFailed(String),
    /// Progress was erased and replaced with a fresh profile.
    Reset,
}

/// Inputs consumed from the world and presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub enum GameInput {
    QuizStarted {
        mission_id: MissionId,
        questions: Vec<Question>,
    },
    AnswerSubmitted { selected: usize },
    /// The player dismissed per-answer feedback.
    AdvanceQuiz,
    /// The quiz window was closed before finishing.
    QuizAbandoned,
    NpcPickup { item_id: String },
    StepsTaken { steps: u64 },
}

/// Identifies one subscriber.
pub type SubscriptionId = u64;

/// Receiving end of a store subscription.
///
/// Hand it back to `ProgressStore::unsubscribe`, or just drop it.
#[derive(Debug)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) receiver: Receiver<ProgressEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Events delivered so far, without blocking.
    pub fn try_iter(&self) -> TryIter<'_, ProgressEvent> {
        self.receiver.try_iter()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.receiver.try_iter().collect()
    }
}
