use async_trait::async_trait;

use crate::application::dto::PlotRecord;
use crate::domain::value_objects::WorldRef;

/// Load/save failures against the durable plot store
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on plot store of world '{world}': {source}")]
    Io {
        world: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed plot store of world '{world}': {source}")]
    Malformed {
        world: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not serialize plots of world '{world}': {source}")]
    Serialization {
        world: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("World name '{0}' cannot be used as a store file name")]
    InvalidWorldName(String),
}

/// Durable store holding the full plot set of each world
///
/// A world with no store yet is not an error: `load` creates an empty one
/// and returns no records.
#[async_trait]
pub trait PlotStorePort: Send + Sync {
    async fn load(&self, world: &WorldRef) -> Result<Vec<PlotRecord>, PersistenceError>;

    /// Overwrite the world's store with exactly these records
    async fn save(&self, world: &WorldRef, records: &[PlotRecord]) -> Result<(), PersistenceError>;
}
