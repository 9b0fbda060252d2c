//! Leaderboard submission.
//!
//! The ranking service is an external collaborator. It only ever sees a
//! sanitized [`RankingEntry`], and a record is only replaced when the new
//! score is strictly higher. Failures are reported to the caller and
//! logged; nothing is retried here.

use std::collections::HashMap;

use ecoquest_logic::progress::PlayerProgress;
use ecoquest_logic::ranking::{should_replace, RankingEntry};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("ranking service unavailable: {0}")]
    Unavailable(String),
    #[error("ranking service rejected the entry: {0}")]
    Rejected(String),
}

/// Remote leaderboard.
pub trait RankingService {
    /// Best stored score for a player, if any.
    fn best_score(&self, player_name: &str) -> Result<Option<u64>, RankingError>;
    fn store(&mut self, entry: RankingEntry) -> Result<(), RankingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    SkippedNotHigher,
}

/// Submit `progress` unless the stored record is at least as high.
pub fn submit_if_higher<R: RankingService>(
    service: &mut R,
    progress: &PlayerProgress,
) -> Result<SubmitOutcome, RankingError> {
    let entry = RankingEntry::from_progress(progress);
    let previous = service.best_score(&entry.player_name).map_err(|e| {
        log::error!("Ranking lookup for {} failed: {}", entry.player_name, e);
        e
    })?;

    if !should_replace(entry.total_score, previous) {
        log::info!(
            "Ranking for {} unchanged ({} <= {:?})",
            entry.player_name,
            entry.total_score,
            previous
        );
        return Ok(SubmitOutcome::SkippedNotHigher);
    }

    let name = entry.player_name.clone();
    let score = entry.total_score;
    service.store(entry).map_err(|e| {
        log::error!("Ranking submission for {} failed: {}", name, e);
        e
    })?;
    log::info!("Ranking for {} updated to {}", name, score);
    Ok(SubmitOutcome::Submitted)
}

/// In-process leaderboard.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRanking {
    entries: HashMap<String, RankingEntry>,
    /// When set, every call fails with `Unavailable`.
    pub offline: bool,
}

impl InMemoryRanking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, player_name: &str) -> Option<&RankingEntry> {
        self.entries.get(player_name)
    }

    /// Entries ordered by descending score, ties by name.
    pub fn leaderboard(&self) -> Vec<&RankingEntry> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        all
    }
}

impl RankingService for InMemoryRanking {
    fn best_score(&self, player_name: &str) -> Result<Option<u64>, RankingError> {
        if self.offline {
            return Err(RankingError::Unavailable("offline".into()));
        }
        Ok(self.entries.get(player_name).map(|e| e.total_score))
    }

    fn store(&mut self, entry: RankingEntry) -> Result<(), RankingError> {
        if self.offline {
            return Err(RankingError::Unavailable("offline".into()));
        }
        self.entries.insert(entry.player_name.clone(), entry);
        Ok(())
    }
}
