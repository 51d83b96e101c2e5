//! World identity as seen by the plot registry

use serde::{Deserialize, Serialize};

use super::WorldId;

/// Reference to a host world
///
/// The id keys the registry directory; the name is what players and the
/// persisted file layout see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldRef {
    pub id: WorldId,
    pub name: String,
}

impl WorldRef {
    pub fn new(id: WorldId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// A world reference that cannot identify any world (nil id or blank name)
    pub fn is_unset(&self) -> bool {
        self.id.is_nil() || self.name.trim().is_empty()
    }
}

impl std::fmt::Display for WorldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
