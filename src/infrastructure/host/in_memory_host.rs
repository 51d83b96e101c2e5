//! Embedded world host
//!
//! Keeps sign blocks and protected regions in memory. The daemon loads it
//! from a JSON snapshot exported by the game server and writes it back on
//! shutdown; tests drive it directly.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::application::ports::outbound::{HostError, WorldHostPort};
use crate::domain::value_objects::{BlockPos, Marker, ProtectedRegion, WorldId, WorldRef};

#[derive(Debug, Clone)]
struct HostWorld {
    world: WorldRef,
    /// Sign position -> text lines
    markers: HashMap<BlockPos, Vec<String>>,
    regions: HashMap<String, ProtectedRegion>,
}

impl HostWorld {
    fn new(world: WorldRef) -> Self {
        Self {
            world,
            markers: HashMap::new(),
            regions: HashMap::new(),
        }
    }
}

/// On-disk form of the host state
#[derive(Debug, Default, Serialize, Deserialize)]
struct HostSnapshot {
    worlds: Vec<WorldSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    world: WorldRef,
    #[serde(default)]
    markers: Vec<MarkerSnapshot>,
    #[serde(default)]
    regions: Vec<ProtectedRegion>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkerSnapshot {
    position: BlockPos,
    #[serde(default)]
    lines: Vec<String>,
}

/// In-memory implementation of [`WorldHostPort`]
pub struct InMemoryWorldHost {
    worlds: RwLock<HashMap<WorldId, HostWorld>>,
    available: AtomicBool,
}

impl Default for InMemoryWorldHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorldHost {
    pub fn new() -> Self {
        Self {
            worlds: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Load host state from a snapshot file; a missing file yields an empty host
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        let host = Self::new();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::info!("No host snapshot at {}, starting empty", path.display());
            return Ok(host);
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read host snapshot {}", path.display()))?;
        let snapshot: HostSnapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed host snapshot {}", path.display()))?;

        {
            let mut worlds = host.worlds.write().await;
            for entry in snapshot.worlds {
                let mut world = HostWorld::new(entry.world.clone());
                for marker in entry.markers {
                    world.markers.insert(marker.position, marker.lines);
                }
                for region in entry.regions {
                    world.regions.insert(region.id.clone(), region);
                }
                worlds.insert(entry.world.id, world);
            }
        }
        Ok(host)
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = {
            let worlds = self.worlds.read().await;
            let mut entries: Vec<WorldSnapshot> = worlds
                .values()
                .map(|w| {
                    let mut markers: Vec<MarkerSnapshot> = w
                        .markers
                        .iter()
                        .map(|(position, lines)| MarkerSnapshot {
                            position: *position,
                            lines: lines.clone(),
                        })
                        .collect();
                    markers.sort_by_key(|m| m.position);
                    let mut regions: Vec<ProtectedRegion> = w.regions.values().cloned().collect();
                    regions.sort_by(|a, b| a.id.cmp(&b.id));
                    WorldSnapshot {
                        world: w.world.clone(),
                        markers,
                        regions,
                    }
                })
                .collect();
            entries.sort_by(|a, b| a.world.name.cmp(&b.world.name));
            HostSnapshot { worlds: entries }
        };

        let json =
            serde_json::to_vec_pretty(&snapshot).context("Failed to serialize host snapshot")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write host snapshot {}", path.display()))?;
        Ok(())
    }

    /// Simulate the host going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn worlds(&self) -> Vec<WorldRef> {
        let mut worlds: Vec<WorldRef> = self
            .worlds
            .read()
            .await
            .values()
            .map(|w| w.world.clone())
            .collect();
        worlds.sort_by(|a, b| a.name.cmp(&b.name));
        worlds
    }

    pub async fn place_marker(&self, world: &WorldRef, marker: Marker) {
        let mut worlds = self.worlds.write().await;
        let entry = worlds
            .entry(world.id)
            .or_insert_with(|| HostWorld::new(world.clone()));
        entry.markers.entry(marker.position).or_default();
    }

    /// Returns true if a sign stood there
    pub async fn break_marker(&self, world: &WorldRef, marker: &Marker) -> bool {
        let mut worlds = self.worlds.write().await;
        worlds
            .get_mut(&world.id)
            .map(|w| w.markers.remove(&marker.position).is_some())
            .unwrap_or(false)
    }

    pub async fn define_region(&self, world: &WorldRef, region: ProtectedRegion) {
        let mut worlds = self.worlds.write().await;
        let entry = worlds
            .entry(world.id)
            .or_insert_with(|| HostWorld::new(world.clone()));
        entry.regions.insert(region.id.clone(), region);
    }

    /// Returns true if the region was defined
    pub async fn delete_region(&self, world: &WorldRef, region_id: &str) -> bool {
        let mut worlds = self.worlds.write().await;
        worlds
            .get_mut(&world.id)
            .map(|w| w.regions.remove(region_id).is_some())
            .unwrap_or(false)
    }

    pub async fn region(&self, world: &WorldRef, region_id: &str) -> Option<ProtectedRegion> {
        let worlds = self.worlds.read().await;
        worlds.get(&world.id)?.regions.get(region_id).cloned()
    }

    pub async fn marker_label(&self, world: &WorldRef, marker: &Marker) -> Option<Vec<String>> {
        let worlds = self.worlds.read().await;
        worlds.get(&world.id)?.markers.get(&marker.position).cloned()
    }

    fn ensure_available(&self) -> Result<(), HostError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HostError::Unavailable("embedded host is offline".to_string()))
        }
    }
}

#[async_trait]
impl WorldHostPort for InMemoryWorldHost {
    async fn marker_exists(&self, world: &WorldRef, marker: &Marker) -> Result<bool, HostError> {
        self.ensure_available()?;
        let worlds = self.worlds.read().await;
        let host_world = worlds
            .get(&world.id)
            .ok_or(HostError::UnknownWorld(world.id))?;
        Ok(host_world.markers.contains_key(&marker.position))
    }

    async fn region_exists(&self, world: &WorldRef, region_id: &str) -> Result<bool, HostError> {
        self.ensure_available()?;
        let worlds = self.worlds.read().await;
        let host_world = worlds
            .get(&world.id)
            .ok_or(HostError::UnknownWorld(world.id))?;
        Ok(host_world.regions.contains_key(region_id))
    }

    async fn apply_region(
        &self,
        world: &WorldRef,
        region: &ProtectedRegion,
    ) -> Result<(), HostError> {
        self.ensure_available()?;
        let mut worlds = self.worlds.write().await;
        let host_world = worlds
            .get_mut(&world.id)
            .ok_or(HostError::UnknownWorld(world.id))?;
        let existing = host_world
            .regions
            .get_mut(&region.id)
            .ok_or_else(|| HostError::UnknownRegion(region.id.clone()))?;
        *existing = region.clone();
        Ok(())
    }

    async fn release_region(&self, world: &WorldRef, region_id: &str) -> Result<(), HostError> {
        self.ensure_available()?;
        let mut worlds = self.worlds.write().await;
        let host_world = worlds
            .get_mut(&world.id)
            .ok_or(HostError::UnknownWorld(world.id))?;
        host_world.regions.remove(region_id);
        Ok(())
    }

    async fn write_marker_label(
        &self,
        world: &WorldRef,
        marker: &Marker,
        lines: &[String],
    ) -> Result<(), HostError> {
        self.ensure_available()?;
        let mut worlds = self.worlds.write().await;
        let host_world = worlds
            .get_mut(&world.id)
            .ok_or(HostError::UnknownWorld(world.id))?;
        let label = host_world
            .markers
            .get_mut(&marker.position)
            .ok_or_else(|| HostError::UnknownMarker(marker.to_string()))?;
        *label = lines.to_vec();
        Ok(())
    }
}
