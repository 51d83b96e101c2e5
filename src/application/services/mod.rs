//! Application services - The plot lifecycle
//!
//! Registries own the plots of one world, the directory owns the
//! registries, and the scheduler keeps them healthy in the background.

pub mod maintenance_scheduler;
pub mod plot_registry;
pub mod registry_directory;

#[cfg(test)]
pub(crate) mod test_support;

pub use maintenance_scheduler::{delay_until_next_run, MaintenanceScheduler};
pub use plot_registry::{
    EvictedPlot, MaintenanceOutcome, MembershipError, PlotRegistry, SweepReport,
};
pub use registry_directory::{
    DirectoryError, MaintenanceReport, RegistryDirectory, SaveAllError, SaveFailure,
};
