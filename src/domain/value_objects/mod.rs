//! Value objects - Immutable objects defined by their attributes

mod ids;
mod position;
mod region;
mod world;

pub use ids::*;
pub use position::{BlockPos, Marker};
pub use region::{
    FlagSetting, FlagState, ProtectedRegion, RegionBounds, RegionFlag, RegionGroup,
    DEFAULT_MEMBER_FLAGS, DEFAULT_PLOT_PRIORITY,
};
pub use world::WorldRef;
