//! Protected region value objects
//!
//! A protected region is the area a plot claims. The host enforces the
//! access-control flags; the plot keeps the authoritative copy so it can be
//! persisted and re-applied.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::BlockPos;

/// Priority given to every plot region on a successful add
pub const DEFAULT_PLOT_PRIORITY: i32 = 20;

/// Flags a plot grants to its members by default
pub const DEFAULT_MEMBER_FLAGS: [RegionFlag; 5] = [
    RegionFlag::Build,
    RegionFlag::BlockBreak,
    RegionFlag::BlockPlace,
    RegionFlag::Use,
    RegionFlag::Interact,
];

/// Access-control flag on a protected region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionFlag {
    Build,
    BlockBreak,
    BlockPlace,
    Use,
    Interact,
}

impl std::fmt::Display for RegionFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionFlag::Build => write!(f, "build"),
            RegionFlag::BlockBreak => write!(f, "block-break"),
            RegionFlag::BlockPlace => write!(f, "block-place"),
            RegionFlag::Use => write!(f, "use"),
            RegionFlag::Interact => write!(f, "interact"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagState {
    Allow,
    Deny,
}

/// Which players a flag applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionGroup {
    Members,
    Owners,
    NonMembers,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSetting {
    pub state: FlagState,
    pub group: RegionGroup,
}

/// Axis-aligned box between two corner blocks (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl RegionBounds {
    /// Build bounds from any two opposite corners
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }
}

/// A protected region claimed by a plot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRegion {
    /// Host-side region id
    pub id: String,
    pub bounds: RegionBounds,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub flags: BTreeMap<RegionFlag, FlagSetting>,
    /// Players granted secondary access
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl ProtectedRegion {
    pub fn new(id: impl Into<String>, bounds: RegionBounds) -> Self {
        Self {
            id: id.into(),
            bounds,
            priority: 0,
            flags: BTreeMap::new(),
            members: BTreeSet::new(),
        }
    }

    pub fn with_member(mut self, player: impl Into<String>) -> Self {
        self.members.insert(player.into());
        self
    }

    /// Apply the fixed plot defaults: owner-mediated priority and member-only
    /// building and interaction
    pub fn apply_plot_defaults(&mut self) {
        self.priority = DEFAULT_PLOT_PRIORITY;
        for flag in DEFAULT_MEMBER_FLAGS {
            self.flags.insert(
                flag,
                FlagSetting {
                    state: FlagState::Allow,
                    group: RegionGroup::Members,
                },
            );
        }
    }

    pub fn flag(&self, flag: RegionFlag) -> Option<FlagSetting> {
        self.flags.get(&flag).copied()
    }

    pub fn is_member(&self, player: &str) -> bool {
        self.members.contains(player)
    }
}
