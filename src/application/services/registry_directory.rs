//! Registry Directory - One plot registry per world
//!
//! The directory is created once at startup and handed to every
//! collaborator. Registries are opened lazily on first lookup; concurrent
//! first lookups of the same world still open exactly one registry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, instrument};

use crate::application::ports::outbound::{PersistenceError, PlotStorePort, WorldHostPort};
use crate::application::services::maintenance_scheduler::MaintenanceScheduler;
use crate::application::services::plot_registry::PlotRegistry;
use crate::domain::entities::{Plot, ValidationError};
use crate::domain::value_objects::{WorldId, WorldRef};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A world whose plots could not be saved
#[derive(Debug)]
pub struct SaveFailure {
    pub world: WorldRef,
    pub error: PersistenceError,
}

/// Every failure of a save-all pass; the other worlds were still saved
#[derive(Debug, thiserror::Error)]
#[error("Failed to save plots of {} world(s)", .failures.len())]
pub struct SaveAllError {
    pub failures: Vec<SaveFailure>,
}

/// Summary of one maintenance pass over all registries
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub registries: usize,
    pub evicted: usize,
    pub refresh_failures: usize,
    /// Worlds whose maintenance aborted
    pub failed: Vec<WorldRef>,
}

pub struct RegistryDirectory {
    registries: RwLock<HashMap<WorldId, Arc<PlotRegistry>>>,
    /// Serializes registry creation
    creation: Mutex<()>,
    host: Arc<dyn WorldHostPort>,
    store: Arc<dyn PlotStorePort>,
    scheduler: Arc<MaintenanceScheduler>,
    me: Weak<RegistryDirectory>,
}

impl RegistryDirectory {
    pub fn new(
        host: Arc<dyn WorldHostPort>,
        store: Arc<dyn PlotStorePort>,
        scheduler: Arc<MaintenanceScheduler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            registries: RwLock::new(HashMap::new()),
            creation: Mutex::new(()),
            host,
            store,
            scheduler,
            me: me.clone(),
        })
    }

    /// The registry of `world`, opening it from the store on first use
    pub async fn get(&self, world: &WorldRef) -> Result<Arc<PlotRegistry>, DirectoryError> {
        if world.is_unset() {
            return Err(DirectoryError::InvalidArgument(format!(
                "world reference is unset (id {}, name '{}')",
                world.id, world.name
            )));
        }

        if let Some(registry) = self.registries.read().await.get(&world.id) {
            return Ok(registry.clone());
        }

        let _creating = self.creation.lock().await;
        if let Some(registry) = self.registries.read().await.get(&world.id) {
            return Ok(registry.clone());
        }

        let registry = Arc::new(
            PlotRegistry::open(world.clone(), self.host.clone(), self.store.clone()).await?,
        );
        self.registries.write().await.insert(world.id, registry.clone());
        self.scheduler.arm(self.me.clone());
        Ok(registry)
    }

    /// Snapshot of every open registry, ordered by world name
    pub async fn list_active(&self) -> Vec<Arc<PlotRegistry>> {
        let mut registries: Vec<Arc<PlotRegistry>> =
            self.registries.read().await.values().cloned().collect();
        registries.sort_by(|a, b| a.world().name.cmp(&b.world().name));
        registries
    }

    /// Add a plot to the registry of its own world
    pub async fn add(&self, plot: Plot) -> Result<bool, DirectoryError> {
        let registry = self.get(&plot.world).await?;
        Ok(registry.add(plot).await?)
    }

    /// Remove a plot from the registry of its own world
    pub async fn remove(&self, plot: &Plot) -> Result<bool, DirectoryError> {
        let registry = self.get(&plot.world).await?;
        Ok(registry.remove(plot).await)
    }

    /// Save every open registry
    ///
    /// All worlds are attempted; returns how many were saved, or every
    /// failure if any world could not be written.
    #[instrument(skip(self))]
    pub async fn save_all(&self) -> Result<usize, SaveAllError> {
        let registries = self.list_active().await;
        let results = join_all(registries.iter().map(|registry| async move {
            (registry.world().clone(), registry.save().await)
        }))
        .await;

        let mut failures = Vec::new();
        for (world, result) in results {
            if let Err(e) = result {
                error!("Failed to save plots of world '{}': {}", world.name, e);
                failures.push(SaveFailure { world, error: e });
            }
        }

        if failures.is_empty() {
            Ok(registries.len())
        } else {
            Err(SaveAllError { failures })
        }
    }

    /// Run maintenance on every open registry
    ///
    /// Each registry runs in its own task so one failing world does not
    /// stop the others.
    pub async fn maintain_all(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();
        for registry in self.list_active().await {
            let world = registry.world().clone();
            report.registries += 1;
            match tokio::spawn(async move { registry.maintain().await }).await {
                Ok(outcome) => {
                    report.evicted += outcome.sweep.evicted.len();
                    report.refresh_failures += outcome.refresh_failures;
                }
                Err(e) => {
                    error!("Maintenance of world '{}' failed: {}", world.name, e);
                    report.failed.push(world);
                }
            }
        }
        report
    }
}
