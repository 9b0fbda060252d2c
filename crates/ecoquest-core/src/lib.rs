//! EcoQuest Core - Progress Store and Persistence
//!
//! Owns a player's progress for a game session on top of the pure rules in
//! `ecoquest_logic`. Loads and validates the saved record at startup, writes
//! it back after every mutation, and notifies subscribers.
//!
//! # Architecture
//!
//! - **Store**: [`store::ProgressStore`], the explicit session context
//! - **Persistence**: checksummed bincode records and JSON backups
//! - **Storage**: pluggable byte-string backends and clocks
//! - **Events**: typed inputs from the world, typed notifications out
//!
//! # Example
//!
//! ```rust
//! use ecoquest_core::prelude::*;
//! use ecoquest_logic::scoring::Question;
//!
//! let mut store = ProgressStore::open(
//!     MemoryStorage::new(),
//!     ManualClock::new(0),
//!     "Ana",
//!     GameConfig::default(),
//! );
//! let hud = store.subscribe();
//!
//! let q = Question::new("Where do banana peels go?", &["Compost", "Plastic bin"], 0);
//! store.start_quiz(1, vec![q]).unwrap();
//! store.tick(6.0).unwrap();
//! store.submit_answer(0).unwrap();
//!
//! assert_eq!(store.progress().badges, vec!["Eco-Kabataan".to_string()]);
//! assert!(!hud.drain().is_empty());
//! ```

pub mod config;
pub mod events;
pub mod persistence;
pub mod ranking;
pub mod storage;
pub mod store;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::config::{GameConfig, StoreConfig};
    pub use crate::events::{GameInput, MissionStatus, ProgressEvent, Subscription};
    pub use crate::persistence::{load_and_validate, SaveError};
    pub use crate::storage::{Clock, FileStorage, ManualClock, MemoryStorage, Storage, SystemClock};
    pub use crate::store::{ProgressStore, StoreError};
}
