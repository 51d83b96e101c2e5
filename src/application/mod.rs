//! Application layer - Use cases over the plot domain
//!
//! This layer contains:
//! - Ports: what the core needs from the world host and the durable store
//! - DTOs: the persisted plot record
//! - Services: plot registry, registry directory, maintenance scheduler

pub mod dto;
pub mod ports;
pub mod services;
