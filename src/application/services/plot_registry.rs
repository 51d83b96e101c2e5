//! Plot Registry - The in-memory plot set of one world
//!
//! The registry owns every plot currently believed valid in its world.
//! Every read first runs a validation sweep, so callers never see a plot
//! whose sign or region has disappeared. All mutations and sweeps are
//! serialized by the registry's lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::application::dto::PlotRecord;
use crate::application::ports::outbound::{
    HostError, PersistenceError, PlotStorePort, WorldHostPort,
};
use crate::domain::entities::{Plot, ValidationError};
use crate::domain::value_objects::{Marker, WorldRef};

/// Errors from member and owner changes
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Plot not found: {0}")]
    PlotNotFound(String),

    #[error("Change stored, but the host could not be updated: {0}")]
    Host(#[from] HostError),
}

/// A plot dropped by a validation sweep
#[derive(Debug, Clone)]
pub struct EvictedPlot {
    pub name: String,
    pub reason: ValidationError,
}

/// Outcome of one validation sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Plots examined
    pub checked: usize,
    pub evicted: Vec<EvictedPlot>,
}

/// Outcome of a sweep followed by a refresh of the surviving plots
#[derive(Debug, Clone, Default)]
pub struct MaintenanceOutcome {
    pub sweep: SweepReport,
    pub refreshed: usize,
    pub refresh_failures: usize,
}

pub struct PlotRegistry {
    world: WorldRef,
    plots: Mutex<Vec<Plot>>,
    host: Arc<dyn WorldHostPort>,
    store: Arc<dyn PlotStorePort>,
}

impl PlotRegistry {
    /// Load the world's plots from the store and bring them up to date
    ///
    /// Records that cannot form a plot are dropped; the rest go through a
    /// full sweep and refresh before the registry is handed out.
    #[instrument(skip_all, fields(world = %world.name))]
    pub async fn open(
        world: WorldRef,
        host: Arc<dyn WorldHostPort>,
        store: Arc<dyn PlotStorePort>,
    ) -> Result<Self, PersistenceError> {
        info!("Loading plots for world '{}'", world.name);
        let records = store.load(&world).await?;

        let mut plots: Vec<Plot> = Vec::with_capacity(records.len());
        for record in records {
            let name = record.name.clone();
            let plot = match Plot::from_record(&world, record) {
                Ok(plot) => plot,
                Err(reason) => {
                    warn!(
                        "Removing plot {} in world {}. Reason: {}",
                        name, world.name, reason
                    );
                    continue;
                }
            };
            if let Some(existing) = plots.iter().find(|p| p.marker == plot.marker) {
                warn!(
                    "Removing plot {} in world {}. Reason: {}",
                    plot.name,
                    world.name,
                    ValidationError::DuplicateMarker {
                        existing: existing.name.clone()
                    }
                );
                continue;
            }
            plots.push(plot);
        }

        let registry = Self {
            world,
            plots: Mutex::new(plots),
            host,
            store,
        };
        registry.maintain().await;
        Ok(registry)
    }

    pub fn world(&self) -> &WorldRef {
        &self.world
    }

    /// Number of plots currently held, without sweeping
    pub async fn plot_count(&self) -> usize {
        self.plots.lock().await.len()
    }

    /// Find the plot anchored to `marker`
    pub async fn find_by_marker(&self, marker: &Marker) -> Option<Plot> {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;
        plots.iter().find(|p| p.marker == *marker).cloned()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Plot> {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;
        plots.iter().find(|p| p.name == name).cloned()
    }

    /// Snapshot of all valid plots
    pub async fn list(&self) -> Vec<Plot> {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;
        plots.clone()
    }

    /// Add a new plot
    ///
    /// Returns `Ok(false)` if this very plot is already registered.
    #[instrument(skip(self, plot), fields(world = %self.world.name, plot = %plot.name))]
    pub async fn add(&self, mut plot: Plot) -> Result<bool, ValidationError> {
        if plot.world.id != self.world.id {
            return Err(ValidationError::WrongWorld {
                plot_world: plot.world.name.clone(),
                registry_world: self.world.name.clone(),
            });
        }
        plot.validate(self.host.as_ref()).await?;

        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;

        if let Some(existing) = plots.iter().find(|p| p.marker == plot.marker) {
            return Err(ValidationError::DuplicateMarker {
                existing: existing.name.clone(),
            });
        }
        if plots.iter().any(|p| p.name == plot.name) {
            return Err(ValidationError::DuplicateName {
                name: plot.name.clone(),
            });
        }
        if plots.iter().any(|p| p.id == plot.id) {
            return Ok(false);
        }

        plot.region.apply_plot_defaults();
        if let Err(e) = plot.refresh(self.host.as_ref()).await {
            warn!(
                "Plot {} added to world {} but the host was not updated: {}",
                plot.name, self.world.name, e
            );
        }
        info!("Added plot {} to world {}", plot.name, self.world.name);
        plots.push(plot);
        Ok(true)
    }

    /// Remove a plot; the plot is invalidated whether or not it was present
    ///
    /// Returns true if the plot was part of the registry.
    #[instrument(skip(self, plot), fields(world = %self.world.name, plot = %plot.name))]
    pub async fn remove(&self, plot: &Plot) -> bool {
        let mut plots = self.plots.lock().await;
        match plots.iter().position(|p| p.id == plot.id) {
            Some(index) => {
                let mut stored = plots.remove(index);
                stored.invalidate(self.host.as_ref()).await;
                info!("Removed plot {} from world {}", stored.name, self.world.name);
                true
            }
            None => {
                let mut detached = plot.clone();
                detached.invalidate(self.host.as_ref()).await;
                debug!("Plot {} was not registered in world {}", plot.name, self.world.name);
                false
            }
        }
    }

    /// Grant a player access to a plot; true if they were not a member yet
    pub async fn add_member(&self, plot_name: &str, player: &str) -> Result<bool, MembershipError> {
        self.change_plot(plot_name, |plot| plot.add_member(player)).await
    }

    /// Revoke a player's access; true if they were a member
    pub async fn remove_member(
        &self,
        plot_name: &str,
        player: &str,
    ) -> Result<bool, MembershipError> {
        self.change_plot(plot_name, |plot| plot.remove_member(player)).await
    }

    pub async fn set_owner(&self, plot_name: &str, owner: &str) -> Result<(), MembershipError> {
        self.change_plot(plot_name, |plot| plot.set_owner(owner)).await
    }

    async fn change_plot<F, R>(&self, plot_name: &str, change: F) -> Result<R, MembershipError>
    where
        F: FnOnce(&mut Plot) -> R + Send,
        R: Send,
    {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;
        let plot = plots
            .iter_mut()
            .find(|p| p.name == plot_name)
            .ok_or_else(|| MembershipError::PlotNotFound(plot_name.to_string()))?;
        let result = change(plot);
        plot.refresh(self.host.as_ref()).await?;
        Ok(result)
    }

    /// Write every valid plot to the store, replacing the world's file
    #[instrument(skip(self), fields(world = %self.world.name))]
    pub async fn save(&self) -> Result<(), PersistenceError> {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await;
        let records: Vec<PlotRecord> = plots.iter().map(Plot::to_record).collect();
        info!("Saving {} plots of world '{}'", records.len(), self.world.name);
        self.store.save(&self.world, &records).await
    }

    /// Validate every plot and evict the invalid ones
    pub async fn sweep(&self) -> SweepReport {
        let mut plots = self.plots.lock().await;
        self.sweep_locked(&mut plots).await
    }

    /// Sweep, then push the state of every surviving plot to the host
    #[instrument(skip(self), fields(world = %self.world.name))]
    pub async fn maintain(&self) -> MaintenanceOutcome {
        let mut plots = self.plots.lock().await;
        let sweep = self.sweep_locked(&mut plots).await;

        let mut outcome = MaintenanceOutcome {
            sweep,
            ..Default::default()
        };
        for plot in plots.iter() {
            match plot.refresh(self.host.as_ref()).await {
                Ok(()) => outcome.refreshed += 1,
                Err(e) => {
                    outcome.refresh_failures += 1;
                    warn!(
                        "Could not refresh plot {} in world {}: {}",
                        plot.name, self.world.name, e
                    );
                }
            }
        }
        outcome
    }

    /// The only place plots are evicted implicitly
    ///
    /// Verdicts are collected first and applied afterwards so the set is
    /// never modified while it is being validated.
    async fn sweep_locked(&self, plots: &mut Vec<Plot>) -> SweepReport {
        let mut verdicts = Vec::new();
        for plot in plots.iter() {
            if let Err(reason) = plot.validate(self.host.as_ref()).await {
                verdicts.push((plot.id, reason));
            }
        }

        let mut report = SweepReport {
            checked: plots.len(),
            evicted: Vec::with_capacity(verdicts.len()),
        };
        for (id, reason) in verdicts {
            let Some(index) = plots.iter().position(|p| p.id == id) else {
                continue;
            };
            let mut plot = plots.remove(index);
            warn!(
                "Removing plot {} in world {}. Reason: {}",
                plot.name, self.world.name, reason
            );
            plot.invalidate(self.host.as_ref()).await;
            report.evicted.push(EvictedPlot {
                name: plot.name,
                reason,
            });
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::MockWorldHostPort;
    use crate::application::services::test_support::{
        create_test_world, plot_with_host_state, LogBuffer, MemoryPlotStore,
    };
    use crate::infrastructure::host::InMemoryWorldHost;
    use crate::infrastructure::persistence::JsonPlotStore;

    async fn open_registry(
        world: &WorldRef,
        host: &Arc<InMemoryWorldHost>,
        store: Arc<dyn PlotStorePort>,
    ) -> PlotRegistry {
        PlotRegistry::open(world.clone(), host.clone(), store)
            .await
            .expect("open registry")
    }

    #[tokio::test]
    async fn test_add_then_find_and_remove() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let plot =
            plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(10, 64, 10)).await;
        assert!(registry.add(plot.clone()).await.unwrap());

        let found = registry.find_by_marker(&plot.marker).await.unwrap();
        assert_eq!(found.id, plot.id);

        assert!(registry.remove(&plot).await);
        assert!(registry.find_by_marker(&plot.marker).await.is_none());
        assert!(registry.find_by_name("Farm").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_marker_scenario() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;
        let sign = Marker::at(10, 64, 10);

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", sign).await;
        assert!(registry.add(farm.clone()).await.unwrap());

        let farm2 = plot_with_host_state(&host, &world, "Farm2", "Bob", sign).await;
        let err = registry.add(farm2).await.unwrap_err();
        assert_eq!(err.conflicting_plot(), Some("Farm"));
        assert!(err.to_string().contains("Farm"));
        assert_eq!(registry.plot_count().await, 1);
        assert!(registry.find_by_name("Farm2").await.is_none());

        assert!(registry.remove(&farm).await);
        assert!(registry.find_by_name("Farm").await.is_none());
    }

    #[tokio::test]
    async fn test_add_applies_defaults_and_labels_sign() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let plot = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        let region_id = plot.region.id.clone();
        registry.add(plot.clone()).await.unwrap();

        let stored = registry.find_by_name("Farm").await.unwrap();
        assert_eq!(stored.region.priority, 20);
        assert_eq!(stored.region.flags.len(), 5);
        assert_eq!(host.region(&world, &region_id).await.unwrap().priority, 20);
        assert_eq!(
            host.marker_label(&world, &plot.marker).await.unwrap(),
            vec!["[Plot]", "Farm", "Alice"]
        );
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_candidate() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let plot = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        host.break_marker(&world, &plot.marker).await;

        let err = registry.add(plot).await.unwrap_err();
        assert!(matches!(err, ValidationError::MarkerMissing { .. }));
        assert_eq!(registry.plot_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_name_and_foreign_world() {
        let world = create_test_world("Overworld");
        let nether = create_test_world("Nether");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        registry.add(farm).await.unwrap();

        let other = plot_with_host_state(&host, &world, "Farm", "Bob", Marker::at(2, 64, 2)).await;
        assert!(matches!(
            registry.add(other).await,
            Err(ValidationError::DuplicateName { .. })
        ));

        let foreign =
            plot_with_host_state(&host, &nether, "Lava", "Bob", Marker::at(3, 64, 3)).await;
        assert!(matches!(
            registry.add(foreign).await,
            Err(ValidationError::WrongWorld { .. })
        ));
    }

    #[tokio::test]
    async fn test_sweep_evicts_plot_whose_sign_was_destroyed() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        let mill = plot_with_host_state(&host, &world, "Mill", "Bob", Marker::at(9, 64, 9)).await;
        registry.add(farm.clone()).await.unwrap();
        registry.add(mill.clone()).await.unwrap();

        host.break_marker(&world, &farm.marker).await;
        let report = registry.sweep().await;

        assert_eq!(report.checked, 2);
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(report.evicted[0].name, "Farm");
        assert!(matches!(
            report.evicted[0].reason,
            ValidationError::MarkerMissing { .. }
        ));
        // Eviction released the region on the host
        assert!(host.region(&world, &farm.region.id).await.is_none());

        let names: Vec<String> = registry.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Mill"]);
    }

    #[tokio::test]
    async fn test_eviction_is_logged_with_world_plot_and_reason() {
        let logs = LogBuffer::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        registry.add(farm.clone()).await.unwrap();
        host.break_marker(&world, &farm.marker).await;
        registry.sweep().await;

        let output = logs.contents();
        let line = output
            .lines()
            .find(|line| line.contains("Removing plot"))
            .expect("eviction was not logged");
        assert!(line.contains("WARN"));
        assert!(line.contains("Farm"));
        assert!(line.contains("Overworld"));
        assert!(line.contains("sign at (1, 64, 1)"));
        assert!(line.contains("no longer exists"));
    }

    #[tokio::test]
    async fn test_list_never_returns_invalid_plots() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        registry.add(farm.clone()).await.unwrap();
        host.delete_region(&world, &farm.region.id).await;

        assert!(registry.list().await.is_empty());
        for plot in registry.list().await {
            assert!(plot.validate(host.as_ref()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_evicts_on_sweep() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        registry.add(farm).await.unwrap();

        host.set_available(false);
        let report = registry.sweep().await;
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(registry.plot_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_invalidates_each_evicted_plot_once() {
        let world = create_test_world("Overworld");
        let store = MemoryPlotStore::new();
        let plot = plot_with_host_state(
            &Arc::new(InMemoryWorldHost::new()),
            &world,
            "Farm",
            "Alice",
            Marker::at(1, 64, 1),
        )
        .await;
        store.insert(&world, vec![plot.to_record()]).await;

        let mut host = MockWorldHostPort::new();
        let mut first_check = true;
        host.expect_marker_exists().returning(move |_, _| {
            // Valid while loading, gone afterwards
            let present = first_check;
            first_check = false;
            Ok(present)
        });
        host.expect_region_exists().returning(|_, _| Ok(true));
        host.expect_write_marker_label().returning(|_, _, _| Ok(()));
        host.expect_apply_region().returning(|_, _| Ok(()));
        host.expect_release_region().times(1).returning(|_, _| Ok(()));

        let registry = PlotRegistry::open(world.clone(), Arc::new(host), Arc::new(store))
            .await
            .unwrap();
        assert_eq!(registry.plot_count().await, 1);

        let report = registry.sweep().await;
        assert_eq!(report.evicted.len(), 1);
        let second = registry.sweep().await;
        assert_eq!(second.checked, 0);
        assert!(second.evicted.is_empty());
    }

    #[tokio::test]
    async fn test_remove_invalidates_unregistered_plot() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let stray = plot_with_host_state(&host, &world, "Stray", "Eve", Marker::at(5, 64, 5)).await;
        assert!(!registry.remove(&stray).await);
        assert!(host.region(&world, &stray.region.id).await.is_none());
    }

    #[tokio::test]
    async fn test_member_and_owner_changes_reach_host() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let registry = open_registry(&world, &host, Arc::new(MemoryPlotStore::new())).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        registry.add(farm.clone()).await.unwrap();

        assert!(registry.add_member("Farm", "Bob").await.unwrap());
        assert!(!registry.add_member("Farm", "Bob").await.unwrap());
        assert!(host.region(&world, &farm.region.id).await.unwrap().is_member("Bob"));

        assert!(registry.remove_member("Farm", "Bob").await.unwrap());
        assert!(!host.region(&world, &farm.region.id).await.unwrap().is_member("Bob"));

        registry.set_owner("Farm", "Carol").await.unwrap();
        assert_eq!(registry.find_by_name("Farm").await.unwrap().owner, "Carol");
        assert_eq!(
            host.marker_label(&world, &farm.marker).await.unwrap()[2],
            "Carol"
        );

        assert!(matches!(
            registry.add_member("Nowhere", "Bob").await,
            Err(MembershipError::PlotNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let store: Arc<dyn PlotStorePort> = Arc::new(JsonPlotStore::new(dir.path(), true));
        let registry = open_registry(&world, &host, store.clone()).await;

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        let mill = plot_with_host_state(&host, &world, "Mill", "Bob", Marker::at(9, 64, 9)).await;
        let ruin = plot_with_host_state(&host, &world, "Ruin", "Eve", Marker::at(30, 64, 30)).await;
        registry.add(farm).await.unwrap();
        registry.add(mill).await.unwrap();
        registry.add(ruin.clone()).await.unwrap();
        registry.add_member("Farm", "Bob").await.unwrap();

        host.break_marker(&world, &ruin.marker).await;
        registry.save().await.unwrap();

        // Simulated restart
        let reloaded = open_registry(&world, &host, store).await;
        let mut before: Vec<PlotRecord> =
            registry.list().await.iter().map(Plot::to_record).collect();
        let mut after: Vec<PlotRecord> =
            reloaded.list().await.iter().map(Plot::to_record).collect();
        before.sort_by(|a, b| a.name.cmp(&b.name));
        after.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(after.len(), 2);
        assert_eq!(before, after);
        assert!(after.iter().all(|r| r.name != "Ruin"));
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let store = Arc::new(MemoryPlotStore::new());
        let registry = open_registry(&world, &host, store.clone()).await;

        store.fail_saves_for(&world.name).await;
        assert!(matches!(
            registry.save().await,
            Err(PersistenceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_drops_records_that_cannot_form_plots() {
        let world = create_test_world("Overworld");
        let host = Arc::new(InMemoryWorldHost::new());
        let store = MemoryPlotStore::new();

        let farm = plot_with_host_state(&host, &world, "Farm", "Alice", Marker::at(1, 64, 1)).await;
        let copy = plot_with_host_state(&host, &world, "Copy", "Bob", Marker::at(1, 64, 1)).await;
        let mut blank =
            plot_with_host_state(&host, &world, "x", "Eve", Marker::at(7, 64, 7)).await.to_record();
        blank.name = String::new();
        store
            .insert(&world, vec![farm.to_record(), copy.to_record(), blank])
            .await;

        let registry = open_registry(&world, &host, Arc::new(store)).await;
        let names: Vec<String> = registry.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Farm"]);
    }
}
