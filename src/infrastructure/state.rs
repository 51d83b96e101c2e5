//! Shared application state

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::services::{MaintenanceScheduler, RegistryDirectory};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::host::InMemoryWorldHost;
use crate::infrastructure::persistence::JsonPlotStore;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub host: Arc<InMemoryWorldHost>,
    pub store: Arc<JsonPlotStore>,
    pub scheduler: Arc<MaintenanceScheduler>,
    /// One plot registry per active world
    pub directory: Arc<RegistryDirectory>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        // Initialize the embedded host from its last snapshot
        let host = Arc::new(
            InMemoryWorldHost::load_snapshot(&config.host_snapshot)
                .await
                .with_context(|| {
                    format!("Failed to load host snapshot {}", config.host_snapshot.display())
                })?,
        );

        let store = Arc::new(JsonPlotStore::new(&config.data_dir, config.pretty_json));

        let scheduler = Arc::new(MaintenanceScheduler::new(
            chrono::Duration::minutes(i64::from(config.maintenance_offset_minutes)),
            config.maintenance_period,
        ));

        let directory = RegistryDirectory::new(host.clone(), store.clone(), scheduler.clone());

        Ok(Self {
            config,
            host,
            store,
            scheduler,
            directory,
        })
    }
}
