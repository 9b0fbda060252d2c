//! Pure progression logic for EcoQuest.
//!
//! This crate contains all progression rules that are independent of any
//! storage, frontend, or runtime. Functions take plain data and return
//! results, making them unit-testable and portable between the desktop
//! client, headless tools, and any future frontend.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`achievements`] | Speed achievements recomputed from counters |
//! | [`catalog`] | Fixed mission table, badge names, level gates |
//! | [`collectibles`] | World pickups and shop inventory |
//! | [`integrity`] | Save checksum and structural invariant checks |
//! | [`progress`] | The `PlayerProgress` aggregate |
//! | [`ranking`] | Sanitized leaderboard projection |
//! | [`resolver`] | Prerequisite-gated mission accessibility |
//! | [`scoring`] | Quiz sessions, countdowns, retries, time tiers |
//! | [`transactions`] | Snapshot-producing progress operations |

pub mod achievements;
pub mod catalog;
pub mod collectibles;
pub mod integrity;
pub mod progress;
pub mod ranking;
pub mod resolver;
pub mod scoring;
pub mod transactions;
