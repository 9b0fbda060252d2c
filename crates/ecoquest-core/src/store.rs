//! Progress store: the single owner of a player's progress for a session.
//!
//! Every mutation goes through the same path:
//!
//! 1. the pure transaction from `ecoquest_logic::transactions` produces the
//!    next snapshot,
//! 2. the snapshot is encoded and written to [`Storage`],
//! 3. subscribers receive the post-transaction snapshot.
//!
//! A failed write is logged and reported as [`ProgressEvent::PersistFailed`];
//! the in-memory snapshot stays authoritative and the next successful save
//! catches storage up.

use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;

use ecoquest_logic::achievements::Achievement;
use ecoquest_logic::catalog::{self, MissionId};
use ecoquest_logic::collectibles;
use ecoquest_logic::integrity::{validate_structure, IntegrityViolation};
use ecoquest_logic::progress::PlayerProgress;
use ecoquest_logic::resolver::{self, mission_states};
use ecoquest_logic::scoring::{
    question_count, NextStep, Question, QuestionOutcome, QuizError, QuizResult, QuizSession,
    SpeedTier,
};
use ecoquest_logic::transactions::{self, CompletionOutcome, TransactionError};
use thiserror::Error;

use crate::config::GameConfig;
use crate::events::{GameInput, MissionStatus, ProgressEvent, Subscription, SubscriptionId};
use crate::persistence::{self, SaveError};
use crate::storage::{Clock, Storage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("no quiz is running")]
    NoActiveQuiz,
    #[error("a quiz for mission {0} is already running")]
    QuizInProgress(MissionId),
    #[error("unknown item {0:?}")]
    UnknownItem(String),
}

/// Storage key of a player's record: the prefix followed by the exact name.
///
/// Distinct names always map to distinct keys; any encoding needed by a
/// backend happens inside that backend.
pub fn storage_key(prefix: &str, player_name: &str) -> String {
    format!("{}{}", prefix, player_name)
}

pub struct ProgressStore<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    config: GameConfig,
    key: String,
    progress: Arc<PlayerProgress>,
    subscribers: Vec<(SubscriptionId, Sender<ProgressEvent>)>,
    next_subscription: SubscriptionId,
    quiz: Option<QuizSession>,

    // Interval bookkeeping, in session seconds
    unflushed_playtime: f64,
    since_integrity_check: f64,
}

impl<S: Storage, C: Clock> ProgressStore<S, C> {
    /// Open the store for `player_name`, loading its saved progress.
    ///
    /// A missing, unreadable, tampered or foreign record yields fresh
    /// progress. Nothing is written until the first mutation.
    pub fn open(storage: S, clock: C, player_name: &str, config: GameConfig) -> Self {
        let key = storage_key(&config.store.storage_key_prefix, player_name);
        let loaded = match storage.get(&key) {
            Ok(Some(bytes)) => persistence::load_and_validate(&bytes),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cannot read saved progress for {}: {}", player_name, e);
                None
            }
        };
        let progress = match loaded {
            Some(p) if p.player_name == player_name => {
                log::info!(
                    "Loaded progress for {}: level {}, {} badges, {} coins",
                    p.player_name,
                    p.level,
                    p.badge_count(),
                    p.coins
                );
                p
            }
            Some(p) => {
                log::warn!(
                    "Saved progress under {} belongs to {}; starting fresh",
                    key,
                    p.player_name
                );
                PlayerProgress::new(player_name)
            }
            None => {
                log::info!("Starting fresh progress for {}", player_name);
                PlayerProgress::new(player_name)
            }
        };

        Self {
            storage,
            clock,
            config,
            key,
            progress: Arc::new(progress),
            subscribers: Vec::new(),
            next_subscription: 0,
            quiz: None,
            unflushed_playtime: 0.0,
            since_integrity_check: 0.0,
        }
    }

    /// Current snapshot.
    pub fn progress(&self) -> &Arc<PlayerProgress> {
        &self.progress
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = channel();
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.retain(|(id, _)| *id != subscription.id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn emit(&mut self, event: ProgressEvent) {
        // Dropped receivers are pruned on the next send.
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    // ------------------------------------------------------------------------
    // Commit path
    // ------------------------------------------------------------------------

    fn commit(&mut self, next: PlayerProgress) {
        self.progress = Arc::new(next);
        self.persist();
        self.emit(ProgressEvent::ProgressChanged(Arc::clone(&self.progress)));
        let states = self.mission_states();
        self.emit(ProgressEvent::MissionStates(states));
    }

    fn persist(&mut self) {
        let result = persistence::encode_save(&self.progress)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.storage
                    .set(&self.key, &bytes)
                    .map_err(|e| e.to_string())
            });
        if let Err(message) = result {
            log::error!("Failed to save progress for {}: {}", self.progress.player_name, message);
            self.emit(ProgressEvent::PersistFailed(message));
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Accessible/locked/completed state of every catalog mission.
    pub fn mission_states(&self) -> Vec<MissionStatus> {
        mission_states(&self.progress.completed_set())
            .into_iter()
            .map(|(mission_id, state)| MissionStatus { mission_id, state })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Apply a finished quiz result. Re-completing a mission changes nothing.
    pub fn complete_mission(
        &mut self,
        mission_id: MissionId,
        result: &QuizResult,
    ) -> Result<CompletionOutcome, StoreError> {
        let (next, outcome) =
            transactions::complete_mission(&self.progress, mission_id, result, self.now())?;
        match &outcome {
            CompletionOutcome::AlreadyCompleted => {}
            CompletionOutcome::AttemptFailed => self.commit(next),
            CompletionOutcome::Completed {
                badge, leveled_up, ..
            } => {
                log::info!(
                    "{} completed mission {} and earned {}",
                    next.player_name,
                    mission_id,
                    badge
                );
                let leveled_up = *leveled_up;
                self.commit(next);
                if let Some(level) = leveled_up {
                    log::info!("{} reached level {}", self.progress.player_name, level);
                    self.emit(ProgressEvent::LevelUp { level });
                }
            }
        }
        Ok(outcome)
    }

    pub fn grant_coins(&mut self, amount: u64) -> Result<(), StoreError> {
        let next = transactions::grant_coins(&self.progress, amount, self.now())?;
        self.commit(next);
        Ok(())
    }

    pub fn spend_coins(&mut self, amount: u64) -> Result<(), StoreError> {
        let next = transactions::spend_coins(&self.progress, amount, self.now())?;
        self.commit(next);
        Ok(())
    }

    /// Collect an item with explicit rewards. Returns false for repeats.
    pub fn collect_item(
        &mut self,
        item_id: &str,
        coin_value: u64,
        point_value: u64,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let (next, granted) =
            transactions::collect_item(&self.progress, item_id, coin_value, point_value, now)?;
        if granted {
            self.commit(next);
        }
        self.emit(ProgressEvent::ItemCollected {
            item_id: item_id.to_string(),
            granted,
        });
        Ok(granted)
    }

    /// Collect a catalog item by id.
    pub fn pickup(&mut self, item_id: &str) -> Result<bool, StoreError> {
        let item = collectibles::collectible(item_id)
            .ok_or_else(|| StoreError::UnknownItem(item_id.to_string()))?;
        self.collect_item(item.id, item.coin_value, item.point_value)
    }

    /// Record a timed sample and claim whatever it unlocks.
    pub fn record_speed_challenge(&mut self, elapsed_secs: f64) -> Option<SpeedTier> {
        let now = self.now();
        let (next, tier) = transactions::record_speed_challenge(&self.progress, elapsed_secs, now);
        let (next, unlocked) = transactions::claim_achievements(&next, now);
        self.commit(next);
        self.announce(unlocked);
        tier
    }

    /// Buy a shop item by id.
    pub fn purchase_item(&mut self, item_id: &str) -> Result<(), StoreError> {
        let item = collectibles::shop_item(item_id)
            .ok_or_else(|| StoreError::UnknownItem(item_id.to_string()))?;
        let next = transactions::purchase_item(&self.progress, item.id, item.price, self.now())?;
        log::info!("{} bought {} for {}", next.player_name, item.name, item.price);
        self.commit(next);
        Ok(())
    }

    pub fn claim_npc_reward(&mut self, npc_id: &str, coins: u64) -> Result<bool, StoreError> {
        let now = self.now();
        let (next, granted) = transactions::claim_npc_reward(&self.progress, npc_id, coins, now)?;
        if granted {
            self.commit(next);
        }
        Ok(granted)
    }

    pub fn equip_title(&mut self, title: &str) -> Result<(), StoreError> {
        let next = transactions::equip_title(&self.progress, title)?;
        self.commit(next);
        Ok(())
    }

    pub fn record_steps(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }
        let next = transactions::record_steps(&self.progress, steps);
        self.commit(next);
    }

    /// Claim newly earned achievements. Each one is returned exactly once.
    pub fn claim_achievements(&mut self) -> Vec<Achievement> {
        let (next, unlocked) = transactions::claim_achievements(&self.progress, self.now());
        if !unlocked.is_empty() {
            self.commit(next);
            self.announce(unlocked.clone());
        }
        unlocked
    }

    fn announce(&mut self, unlocked: Vec<Achievement>) {
        if unlocked.is_empty() {
            return;
        }
        for a in &unlocked {
            log::info!("{} unlocked {}", self.progress.player_name, a.display_name());
        }
        self.emit(ProgressEvent::AchievementUnlocked(unlocked));
    }

    // ------------------------------------------------------------------------
    // Quiz flow
    // ------------------------------------------------------------------------

    /// Begin the quiz for an accessible mission.
    pub fn start_quiz(
        &mut self,
        mission_id: MissionId,
        questions: Vec<Question>,
    ) -> Result<(), StoreError> {
        if let Some(active) = &self.quiz {
            return Err(StoreError::QuizInProgress(active.mission_id()));
        }
        if catalog::mission(mission_id).is_none() {
            return Err(TransactionError::UnknownMission(mission_id).into());
        }
        if !resolver::is_accessible(mission_id, &self.progress.completed_set()) {
            return Err(TransactionError::MissionLocked(mission_id).into());
        }
        let session = QuizSession::start(mission_id, questions, self.config.quiz.clone())?;
        log::info!("{} started the quiz for mission {}", self.progress.player_name, mission_id);
        self.quiz = Some(session);
        Ok(())
    }

    pub fn active_quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn submit_answer(&mut self, selected: usize) -> Result<QuestionOutcome, StoreError> {
        let session = self.quiz.as_mut().ok_or(StoreError::NoActiveQuiz)?;
        let outcome = session.submit(selected)?;
        self.on_quiz_outcome(outcome.clone())?;
        Ok(outcome)
    }

    /// Dismiss feedback: retry the question or move to the next one.
    pub fn advance_quiz(&mut self) -> Result<NextStep, StoreError> {
        let session = self.quiz.as_mut().ok_or(StoreError::NoActiveQuiz)?;
        Ok(session.advance()?)
    }

    /// Close the running quiz without a result. Returns false if none ran.
    pub fn abandon_quiz(&mut self) -> bool {
        match self.quiz.take() {
            Some(mut session) => {
                session.abandon();
                log::info!(
                    "{} abandoned the quiz for mission {}",
                    self.progress.player_name,
                    session.mission_id()
                );
                true
            }
            None => false,
        }
    }

    fn on_quiz_outcome(&mut self, outcome: QuestionOutcome) -> Result<(), StoreError> {
        let terminal = outcome.next.is_terminal();
        self.emit(ProgressEvent::QuizFeedback(outcome));
        if terminal {
            self.finish_quiz()?;
        }
        Ok(())
    }

    fn finish_quiz(&mut self) -> Result<(), StoreError> {
        let Some(result) = self.quiz.take().and_then(|s| s.result()) else {
            return Ok(());
        };
        let mission_id = result.mission_id;
        self.emit(ProgressEvent::QuizFinished {
            mission_id,
            passed: result.is_correct,
        });

        let now = self.now();
        let (next, outcome) =
            transactions::complete_mission(&self.progress, mission_id, &result, now)?;
        match outcome {
            CompletionOutcome::AlreadyCompleted => {}
            CompletionOutcome::AttemptFailed => {
                log::info!("{} failed the quiz for mission {}", next.player_name, mission_id);
                self.commit(next);
            }
            CompletionOutcome::Completed {
                badge, leveled_up, ..
            } => {
                log::info!(
                    "{} completed mission {} and earned {}",
                    next.player_name,
                    mission_id,
                    badge
                );
                let per_question = result.elapsed_secs / question_count(mission_id).max(1) as f64;
                let (next, _) = transactions::record_speed_challenge(&next, per_question, now);
                let (next, unlocked) = transactions::claim_achievements(&next, now);
                self.commit(next);
                if let Some(level) = leveled_up {
                    log::info!("{} reached level {}", self.progress.player_name, level);
                    self.emit(ProgressEvent::LevelUp { level });
                }
                self.announce(unlocked);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------------

    /// Advance session time by `dt` seconds.
    ///
    /// Drives the quiz countdown, flushes accumulated playtime and runs the
    /// periodic integrity check. A quiz error is returned only after the
    /// playtime and integrity steps for this tick have run.
    pub fn tick(&mut self, dt: f64) -> Result<(), StoreError> {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let quiz = match self.quiz.as_mut().and_then(|s| s.tick(dt)) {
            Some(outcome) => self.on_quiz_outcome(outcome),
            None => Ok(()),
        };

        self.unflushed_playtime += dt;
        if self.unflushed_playtime >= self.config.store.playtime_flush_interval_secs {
            self.flush_playtime();
        }

        self.since_integrity_check += dt;
        if self.since_integrity_check >= self.config.store.integrity_check_interval_secs {
            self.since_integrity_check = 0.0;
            self.check_integrity();
        }
        quiz
    }

    /// Save any playtime accumulated since the last flush.
    pub fn flush_playtime(&mut self) {
        if self.unflushed_playtime <= 0.0 {
            return;
        }
        let secs = std::mem::take(&mut self.unflushed_playtime);
        let next = transactions::add_playtime(&self.progress, secs, self.now());
        self.commit(next);
    }

    /// Re-validate the live snapshot. Violations are logged and emitted.
    pub fn check_integrity(&mut self) -> Vec<IntegrityViolation> {
        let violations = validate_structure(&self.progress);
        if !violations.is_empty() {
            log::warn!(
                "Live progress for {} failed {} integrity checks",
                self.progress.player_name,
                violations.len()
            );
            for v in &violations {
                log::warn!("  {}", v);
            }
            self.emit(ProgressEvent::IntegrityWarning(violations.clone()));
        }
        violations
    }

    // ------------------------------------------------------------------------
    // Backup & reset
    // ------------------------------------------------------------------------

    pub fn export(&self) -> Result<String, StoreError> {
        let json = persistence::export_json(&self.progress)?;
        log::info!("Exported progress for {}", self.progress.player_name);
        Ok(json)
    }

    /// Replace progress with a validated backup of the same player.
    ///
    /// On any error the current progress is left untouched.
    pub fn import(&mut self, json: &str) -> Result<(), StoreError> {
        let imported = persistence::import_json(json)?;
        if imported.player_name != self.progress.player_name {
            return Err(SaveError::PlayerMismatch {
                expected: self.progress.player_name.clone(),
                found: imported.player_name,
            }
            .into());
        }
        log::info!(
            "Imported progress for {}: {} badges, {} coins",
            imported.player_name,
            imported.badge_count(),
            imported.coins
        );
        self.commit(imported);
        Ok(())
    }

    /// Erase the saved record and start over.
    pub fn reset(&mut self) {
        if let Some(mut session) = self.quiz.take() {
            session.abandon();
        }
        if let Err(e) = self.storage.remove(&self.key) {
            log::error!("Failed to erase saved progress under {}: {}", self.key, e);
        }
        log::info!("Reset progress for {}", self.progress.player_name);
        self.progress = Arc::new(PlayerProgress::new(self.progress.player_name.clone()));
        self.unflushed_playtime = 0.0;
        self.since_integrity_check = 0.0;
        self.emit(ProgressEvent::Reset);
        self.emit(ProgressEvent::ProgressChanged(Arc::clone(&self.progress)));
        let states = self.mission_states();
        self.emit(ProgressEvent::MissionStates(states));
    }

    // ------------------------------------------------------------------------
    // Input dispatch
    // ------------------------------------------------------------------------

    pub fn handle(&mut self, input: GameInput) -> Result<(), StoreError> {
        match input {
            GameInput::QuizStarted {
                mission_id,
                questions,
            } => self.start_quiz(mission_id, questions),
            GameInput::AnswerSubmitted { selected } => self.submit_answer(selected).map(|_| ()),
            GameInput::AdvanceQuiz => self.advance_quiz().map(|_| ()),
            GameInput::QuizAbandoned => {
                self.abandon_quiz();
                Ok(())
            }
            GameInput::NpcPickup { item_id } => self.pickup(&item_id).map(|_| ()),
            GameInput::StepsTaken { steps } => {
                self.record_steps(steps);
                Ok(())
            }
        }
    }
}
