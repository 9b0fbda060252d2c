//! Mission catalog: the fixed, compiled table of missions and level gates.
//!
//! Missions are identified by dense ids `1..=N`. Each mission lists its
//! prerequisites explicitly: the list is the complete accessibility gate,
//! nothing is derived transitively.
//!
//! ```
//! use ecoquest_logic::catalog::{mission, MISSIONS};
//!
//! let first = mission(1).unwrap();
//! assert_eq!(first.badge_name, "Eco-Kabataan");
//! assert!(first.prerequisites.is_empty());
//! assert_eq!(MISSIONS.len(), 20);
//! ```

use serde::Serialize;

/// Mission identifier (dense, starting at 1).
pub type MissionId = u32;

/// Immutable catalog entry for one mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissionDefinition {
    pub id: MissionId,
    /// Badge awarded on completion. Unique across the catalog.
    pub badge_name: &'static str,
    pub coin_reward: u64,
    pub point_reward: u64,
    /// Level whose advancement this mission counts toward.
    pub level: u32,
    /// Missions that must be completed before this one is accessible.
    pub prerequisites: &'static [MissionId],
}

/// Requirements for leaving a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelRequirement {
    /// The level being left.
    pub level: u32,
    /// Badges needed (all missions gated to this level).
    pub badges_required: usize,
    /// Minimum overall accuracy, in percent.
    pub min_accuracy_percent: f64,
}

/// Level a fresh profile starts at.
pub const STARTING_LEVEL: u32 = 1;

/// Highest modeled level (terminal state).
pub const MAX_LEVEL: u32 = 2;

/// Level-up gates, one per non-terminal level.
pub const LEVEL_REQUIREMENTS: &[LevelRequirement] = &[LevelRequirement {
    level: 1,
    badges_required: 10,
    min_accuracy_percent: 70.0,
}];

// ============================================================================
// MISSIONS
// ============================================================================

const fn def(
    id: MissionId,
    badge_name: &'static str,
    coin_reward: u64,
    point_reward: u64,
    level: u32,
    prerequisites: &'static [MissionId],
) -> MissionDefinition {
    MissionDefinition {
        id,
        badge_name,
        coin_reward,
        point_reward,
        level,
        prerequisites,
    }
}

/// The mission table, ordered by id.
pub static MISSIONS: [MissionDefinition; 20] = [
    // Level 1: the barangay
    def(1, "Eco-Kabataan", 20, 100, 1, &[]),
    def(2, "Tagapangalaga ng Tubig", 25, 110, 1, &[1]),
    def(3, "Bantay Basura", 25, 110, 1, &[1]),
    def(4, "Kaibigan ng Puno", 30, 120, 1, &[2, 3]),
    def(5, "Tagapagligtas ng Hayop", 30, 130, 1, &[4]),
    def(6, "Bayani ng Enerhiya", 30, 130, 1, &[4]),
    def(7, "Mandirigma ng Hangin", 35, 140, 1, &[5, 6]),
    def(8, "Tagapag-recycle", 35, 150, 1, &[7]),
    def(9, "Kampeon ng Karagatan", 40, 150, 1, &[7]),
    def(10, "Luntiang Lider", 50, 200, 1, &[8, 9]),
    // Level 2: the province
    def(11, "Tagabantay ng Bakawan", 40, 160, 2, &[10]),
    def(12, "Hardinero ng Lungsod", 40, 160, 2, &[11]),
    def(13, "Eksperto sa Compost", 40, 170, 2, &[11]),
    def(14, "Tagapagtanggol ng Bahura", 45, 180, 2, &[12, 13]),
    def(15, "Sugo ng Malinis na Ilog", 45, 180, 2, &[14]),
    def(16, "Kalasag ng Klima", 50, 190, 2, &[14]),
    def(17, "Tagapagtanim ng Gubat", 50, 200, 2, &[15, 16]),
    def(18, "Bituin ng Solar", 55, 210, 2, &[17]),
    def(19, "Gabay ng Kalikasan", 55, 220, 2, &[17]),
    def(20, "Bayani ng Daigdig", 100, 300, 2, &[18, 19]),
];

/// Look up a mission in the compiled catalog.
pub fn mission(id: MissionId) -> Option<&'static MissionDefinition> {
    find_in(&MISSIONS, id)
}

/// Look up a mission in an arbitrary catalog slice.
pub fn find_in(catalog: &[MissionDefinition], id: MissionId) -> Option<&MissionDefinition> {
    catalog.iter().find(|m| m.id == id)
}

/// All mission ids in catalog order.
pub fn mission_ids() -> impl Iterator<Item = MissionId> {
    MISSIONS.iter().map(|m| m.id)
}

/// Missions gated to the given level.
pub fn missions_for_level(level: u32) -> impl Iterator<Item = &'static MissionDefinition> {
    MISSIONS.iter().filter(move |m| m.level == level)
}

/// Requirement for advancing out of `level`, if the level is not terminal.
pub fn level_requirement(level: u32) -> Option<&'static LevelRequirement> {
    LEVEL_REQUIREMENTS.iter().find(|r| r.level == level)
}

/// True if `name` is the badge of some catalog mission.
pub fn is_badge(name: &str) -> bool {
    MISSIONS.iter().any(|m| m.badge_name == name)
}
