//! Outbound ports - Interfaces that the application requires from external systems

mod plot_store_port;
mod world_host_port;

pub use plot_store_port::{PersistenceError, PlotStorePort};
pub use world_host_port::{HostError, WorldHostPort};

#[cfg(test)]
pub use world_host_port::MockWorldHostPort;
