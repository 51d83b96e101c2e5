//! World host port - What the registry needs from the running game world
//!
//! The host owns the physical sign blocks and enforces protected regions.
//! Calls are expected to be quick; a failure to reach the host is treated
//! by callers as "does not exist" when validating.

use async_trait::async_trait;

use crate::domain::value_objects::{Marker, ProtectedRegion, WorldId, WorldRef};

#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("Host unavailable: {0}")]
    Unavailable(String),
    #[error("World not loaded on host: {0}")]
    UnknownWorld(WorldId),
    #[error("Region not defined on host: {0}")]
    UnknownRegion(String),
    #[error("No marker at {0}")]
    UnknownMarker(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldHostPort: Send + Sync {
    /// Whether a sign still stands at the marker's block in `world`
    async fn marker_exists(&self, world: &WorldRef, marker: &Marker) -> Result<bool, HostError>;

    /// Whether a region with this id is still defined in `world`
    async fn region_exists(&self, world: &WorldRef, region_id: &str) -> Result<bool, HostError>;

    /// Upsert the region's priority, flags and members on the host
    async fn apply_region(&self, world: &WorldRef, region: &ProtectedRegion)
        -> Result<(), HostError>;

    /// Drop the region from the host's protection
    async fn release_region(&self, world: &WorldRef, region_id: &str) -> Result<(), HostError>;

    /// Rewrite the text lines on the marker sign
    async fn write_marker_label(
        &self,
        world: &WorldRef,
        marker: &Marker,
        lines: &[String],
    ) -> Result<(), HostError>;
}
