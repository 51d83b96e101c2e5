//! Plot entity - A named, owned claim over a protected region
//!
//! Every plot is anchored to a sign in its world. The plot stays valid only
//! while both the sign and its protected region still exist on the host.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::application::dto::PlotRecord;
use crate::application::ports::outbound::{HostError, WorldHostPort};
use crate::domain::value_objects::{Marker, PlotId, ProtectedRegion, WorldRef};

/// First line written on every plot sign
pub const MARKER_HEADER: &str = "[Plot]";

/// Why a plot is (or would be) structurally invalid
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The plot has no name")]
    BlankName,

    #[error("The bounds of region '{0}' are malformed")]
    MalformedRegion(String),

    #[error("The {marker} in world {world} no longer exists")]
    MarkerMissing { marker: Marker, world: String },

    #[error("The region '{region_id}' in world {world} no longer exists")]
    RegionMissing { region_id: String, world: String },

    #[error("This sign is already used by plot {existing}")]
    DuplicateMarker { existing: String },

    #[error("A plot named {name} already exists in this world")]
    DuplicateName { name: String },

    #[error("Plot belongs to world {plot_world}, not {registry_world}")]
    WrongWorld {
        plot_world: String,
        registry_world: String,
    },

    #[error("Plot {name} has been invalidated")]
    Invalidated { name: String },
}

impl ValidationError {
    /// Name of the plot this error conflicts with, if any
    pub fn conflicting_plot(&self) -> Option<&str> {
        match self {
            ValidationError::DuplicateMarker { existing } => Some(existing),
            ValidationError::DuplicateName { name } => Some(name),
            _ => None,
        }
    }
}

/// A land plot
#[derive(Debug, Clone)]
pub struct Plot {
    pub id: PlotId,
    pub world: WorldRef,
    pub name: String,
    pub owner: String,
    pub marker: Marker,
    pub region: ProtectedRegion,
    pub created_at: DateTime<Utc>,
    invalidated: bool,
}

impl Plot {
    pub fn new(
        world: WorldRef,
        name: impl Into<String>,
        owner: impl Into<String>,
        marker: Marker,
        region: ProtectedRegion,
    ) -> Self {
        Self {
            id: PlotId::new(),
            world,
            name: name.into(),
            owner: owner.into(),
            marker,
            region,
            created_at: Utc::now(),
            invalidated: false,
        }
    }

    /// Rebuild a plot from its stored record
    ///
    /// Only the shape of the record is checked here; whether the sign and
    /// region still exist is left to [`Plot::validate`].
    pub fn from_record(world: &WorldRef, record: PlotRecord) -> Result<Self, ValidationError> {
        if record.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        if !record.region.bounds.is_well_formed() {
            return Err(ValidationError::MalformedRegion(record.region.id));
        }
        Ok(Self {
            id: record.id,
            world: world.clone(),
            name: record.name,
            owner: record.owner,
            marker: record.marker,
            region: record.region,
            created_at: record.created_at,
            invalidated: false,
        })
    }

    pub fn to_record(&self) -> PlotRecord {
        PlotRecord {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner.clone(),
            marker: self.marker,
            region: self.region.clone(),
            created_at: self.created_at,
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.region.members.iter().map(String::as_str)
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Check that the sign and the region still exist on the host
    ///
    /// A host that cannot be reached counts as "does not exist".
    pub async fn validate(&self, host: &dyn WorldHostPort) -> Result<(), ValidationError> {
        if self.invalidated {
            return Err(ValidationError::Invalidated {
                name: self.name.clone(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }

        let marker_present = host
            .marker_exists(&self.world, &self.marker)
            .await
            .unwrap_or_else(|e| {
                debug!("Marker check for plot {} failed: {}", self.name, e);
                false
            });
        if !marker_present {
            return Err(ValidationError::MarkerMissing {
                marker: self.marker,
                world: self.world.name.clone(),
            });
        }

        let region_present = host
            .region_exists(&self.world, &self.region.id)
            .await
            .unwrap_or_else(|e| {
                debug!("Region check for plot {} failed: {}", self.name, e);
                false
            });
        if !region_present {
            return Err(ValidationError::RegionMissing {
                region_id: self.region.id.clone(),
                world: self.world.name.clone(),
            });
        }

        Ok(())
    }

    /// Release the plot's claim on the host; later calls do nothing
    pub async fn invalidate(&mut self, host: &dyn WorldHostPort) {
        if self.invalidated {
            return;
        }
        self.invalidated = true;
        if let Err(e) = host.release_region(&self.world, &self.region.id).await {
            warn!(
                "Could not release region {} of plot {} in world {}: {}",
                self.region.id, self.name, self.world.name, e
            );
        }
    }

    /// Push the sign text and region settings to the host
    pub async fn refresh(&self, host: &dyn WorldHostPort) -> Result<(), HostError> {
        host.write_marker_label(&self.world, &self.marker, &self.label_lines())
            .await?;
        host.apply_region(&self.world, &self.region).await
    }

    pub fn label_lines(&self) -> Vec<String> {
        vec![
            MARKER_HEADER.to_string(),
            self.name.clone(),
            self.owner.clone(),
        ]
    }

    /// Returns true if the player was not a member before
    pub fn add_member(&mut self, player: impl Into<String>) -> bool {
        self.region.members.insert(player.into())
    }

    /// Returns true if the player was a member
    pub fn remove_member(&mut self, player: &str) -> bool {
        self.region.members.remove(player)
    }

    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
    }
}
