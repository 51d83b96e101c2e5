//! Persisted shape of a plot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Marker, PlotId, ProtectedRegion};

/// One plot as written to the durable store
///
/// The world is implied by the store file the record lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRecord {
    pub id: PlotId,
    pub name: String,
    pub owner: String,
    pub marker: Marker,
    pub region: ProtectedRegion,
    pub created_at: DateTime<Utc>,
}
