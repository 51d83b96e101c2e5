//! JSON file store - one file per world under `<data>/plots/`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::dto::PlotRecord;
use crate::application::ports::outbound::{PersistenceError, PlotStorePort};
use crate::domain::value_objects::WorldRef;

/// Subdirectory of the data folder holding the plot files
pub const PLOTS_DIR: &str = "plots";

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PlotStoreFile {
    version: u32,
    world: String,
    #[serde(default)]
    plots: Vec<PlotRecord>,
}

pub struct JsonPlotStore {
    root: PathBuf,
    pretty: bool,
}

impl JsonPlotStore {
    /// Store rooted at `<data_dir>/plots`
    pub fn new(data_dir: impl AsRef<Path>, pretty: bool) -> Self {
        Self {
            root: data_dir.as_ref().join(PLOTS_DIR),
            pretty,
        }
    }

    /// Path of the file holding `world`'s plots
    ///
    /// Files are keyed by world name, not id: two worlds sharing a name share a file.
    pub fn file_for(&self, world: &WorldRef) -> Result<PathBuf, PersistenceError> {
        let name = world.name.as_str();
        let unusable = name.trim().is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name.contains("..");
        if unusable {
            return Err(PersistenceError::InvalidWorldName(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    fn io_error(world: &WorldRef, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            world: world.name.clone(),
            source,
        }
    }

    async fn write_file(
        &self,
        world: &WorldRef,
        records: &[PlotRecord],
    ) -> Result<(), PersistenceError> {
        let path = self.file_for(world)?;
        let file = PlotStoreFile {
            version: STORE_VERSION,
            world: world.name.clone(),
            plots: records.to_vec(),
        };
        let json = if self.pretty {
            serde_json::to_vec_pretty(&file)
        } else {
            serde_json::to_vec(&file)
        }
        .map_err(|source| PersistenceError::Serialization {
            world: world.name.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error(world, e))?;

        // Write beside the target and rename so a failed write keeps the old file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Self::io_error(world, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(world, e))?;
        Ok(())
    }
}

#[async_trait]
impl PlotStorePort for JsonPlotStore {
    async fn load(&self, world: &WorldRef) -> Result<Vec<PlotRecord>, PersistenceError> {
        let path = self.file_for(world)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Self::io_error(world, e))?;
        if !exists {
            tracing::info!("Creating empty plot store for world '{}'", world.name);
            self.write_file(world, &[]).await?;
            return Ok(Vec::new());
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Self::io_error(world, e))?;
        let file: PlotStoreFile =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed {
                world: world.name.clone(),
                source,
            })?;
        if file.world != world.name {
            tracing::warn!(
                "Plot store {} names world '{}', loading it for '{}'",
                path.display(),
                file.world,
                world.name
            );
        }
        Ok(file.plots)
    }

    async fn save(&self, world: &WorldRef, records: &[PlotRecord]) -> Result<(), PersistenceError> {
        self.write_file(world, records).await
    }
}
