//! Persistence adapters
//!
//! Implements the plot store port on top of the local file system.

mod json_plot_store;

pub use json_plot_store::{JsonPlotStore, PLOTS_DIR};
