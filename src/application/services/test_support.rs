//! Shared fixtures for service tests

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::dto::PlotRecord;
use crate::application::ports::outbound::{PersistenceError, PlotStorePort};
use crate::domain::entities::Plot;
use crate::domain::value_objects::{
    BlockPos, Marker, ProtectedRegion, RegionBounds, WorldId, WorldRef,
};
use crate::infrastructure::host::InMemoryWorldHost;

pub fn create_test_world(name: &str) -> WorldRef {
    WorldRef::new(WorldId::new(), name)
}

/// Build a plot whose sign and region already exist on `host`
pub async fn plot_with_host_state(
    host: &InMemoryWorldHost,
    world: &WorldRef,
    name: &str,
    owner: &str,
    marker: Marker,
) -> Plot {
    let corner = marker.position;
    let region = ProtectedRegion::new(
        name.to_lowercase(),
        RegionBounds::from_corners(
            BlockPos::new(corner.x - 5, corner.y - 5, corner.z - 5),
            BlockPos::new(corner.x + 5, corner.y + 5, corner.z + 5),
        ),
    );
    host.place_marker(world, marker).await;
    host.define_region(world, region.clone()).await;
    Plot::new(world.clone(), name, owner, marker, region)
}

/// Plot store kept in memory, with load counting and injectable save failures
#[derive(Default)]
pub struct MemoryPlotStore {
    records: Mutex<HashMap<WorldId, Vec<PlotRecord>>>,
    failing: Mutex<HashSet<String>>,
    loads: AtomicUsize,
}

impl MemoryPlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, world: &WorldRef, records: Vec<PlotRecord>) {
        self.records.lock().await.insert(world.id, records);
    }

    pub async fn records(&self, world: &WorldRef) -> Option<Vec<PlotRecord>> {
        self.records.lock().await.get(&world.id).cloned()
    }

    pub async fn fail_saves_for(&self, world_name: &str) {
        self.failing.lock().await.insert(world_name.to_string());
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlotStorePort for MemoryPlotStore {
    async fn load(&self, world: &WorldRef) -> Result<Vec<PlotRecord>, PersistenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Give racing loaders a chance to interleave
        tokio::task::yield_now().await;
        let mut records = self.records.lock().await;
        Ok(records.entry(world.id).or_default().clone())
    }

    async fn save(&self, world: &WorldRef, records: &[PlotRecord]) -> Result<(), PersistenceError> {
        if self.failing.lock().await.contains(&world.name) {
            return Err(PersistenceError::Io {
                world: world.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.records.lock().await.insert(world.id, records.to_vec());
        Ok(())
    }
}

/// Captures formatted log output so tests can assert on it
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl LogBuffer {
    /// Subscriber writing plain-text events of every level into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let buffer = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || buffer.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().expect("log buffer lock");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("log buffer lock")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
