//! Mission dependency resolution.
//!
//! A mission is accessible when every id in its prerequisite list is in
//! the completed set. This is a plain containment check: prerequisite
//! lists are authored as the full gate, so there is no graph traversal
//! and a malformed (cyclic) catalog can never loop: a mission caught in
//! a cycle is simply never accessible.
//!
//! ```
//! use std::collections::BTreeSet;
//! use ecoquest_logic::resolver::{is_accessible, list_available};
//!
//! let done = BTreeSet::from([1]);
//! assert!(is_accessible(2, &done));
//! assert!(!is_accessible(4, &done));
//! assert_eq!(list_available(&done), BTreeSet::from([2, 3]));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{find_in, MissionDefinition, MissionId, MISSIONS};

/// Display state of a mission, used for world indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionState {
    Locked,
    Accessible,
    Completed,
}

/// Whether `mission_id` may be started given the completed set.
///
/// Unknown missions fail closed.
pub fn is_accessible(mission_id: MissionId, completed: &BTreeSet<MissionId>) -> bool {
    is_accessible_in(&MISSIONS, mission_id, completed)
}

/// [`is_accessible`] over an arbitrary catalog.
pub fn is_accessible_in(
    catalog: &[MissionDefinition],
    mission_id: MissionId,
    completed: &BTreeSet<MissionId>,
) -> bool {
    match find_in(catalog, mission_id) {
        Some(def) => def.prerequisites.iter().all(|p| completed.contains(p)),
        None => false,
    }
}

/// Missions not yet completed whose gates are all satisfied.
pub fn list_available(completed: &BTreeSet<MissionId>) -> BTreeSet<MissionId> {
    list_available_in(&MISSIONS, completed)
}

/// [`list_available`] over an arbitrary catalog.
pub fn list_available_in(
    catalog: &[MissionDefinition],
    completed: &BTreeSet<MissionId>,
) -> BTreeSet<MissionId> {
    catalog
        .iter()
        .map(|m| m.id)
        .filter(|id| !completed.contains(id))
        .filter(|id| is_accessible_in(catalog, *id, completed))
        .collect()
}

/// Indicator state for a single mission.
pub fn mission_state(mission_id: MissionId, completed: &BTreeSet<MissionId>) -> MissionState {
    if completed.contains(&mission_id) {
        MissionState::Completed
    } else if is_accessible(mission_id, completed) {
        MissionState::Accessible
    } else {
        MissionState::Locked
    }
}

/// Indicator states for the whole catalog, in id order.
pub fn mission_states(completed: &BTreeSet<MissionId>) -> Vec<(MissionId, MissionState)> {
    MISSIONS
        .iter()
        .map(|m| (m.id, mission_state(m.id, completed)))
        .collect()
}

/// Missions that became accessible because `just_completed` was added.
pub fn newly_accessible(
    just_completed: MissionId,
    completed_before: &BTreeSet<MissionId>,
) -> BTreeSet<MissionId> {
    let before = list_available(completed_before);
    let mut after_set = completed_before.clone();
    after_set.insert(just_completed);
    list_available(&after_set)
        .into_iter()
        .filter(|id| !before.contains(id))
        .collect()
}
