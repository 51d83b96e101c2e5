//! Plotkeeper daemon
//!
//! Opens a plot registry for every world the host knows about, keeps them
//! maintained until Ctrl+C, then saves every registry and the host snapshot.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plotkeeper::infrastructure::config::AppConfig;
use plotkeeper::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotkeeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Plotkeeper");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Data: {}", config.data_dir.display());
    tracing::info!("  Host snapshot: {}", config.host_snapshot.display());

    // Initialize application state
    let state = Arc::new(AppState::new(config).await?);
    tracing::info!("Application state initialized");

    // Open a registry per known world; the first one arms the maintenance task
    for world in state.host.worlds().await {
        match state.directory.get(&world).await {
            Ok(registry) => {
                tracing::info!(
                    "World '{}' ready with {} plots",
                    world.name,
                    registry.plot_count().await
                );
            }
            Err(e) => {
                tracing::error!("Failed to open plots of world '{}': {}", world.name, e);
            }
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received, saving plots...");

    let saved = match state.directory.save_all().await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::error!("{}", e);
            state
                .directory
                .list_active()
                .await
                .len()
                .saturating_sub(e.failures.len())
        }
    };
    tracing::info!("Saved plots of {} worlds", saved);

    state
        .host
        .save_snapshot(&state.config.host_snapshot)
        .await
        .context("Failed to write host snapshot")?;
    tracing::info!("Host snapshot written");

    Ok(())
}
