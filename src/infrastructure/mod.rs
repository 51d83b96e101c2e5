//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: JSON file store for plot records
//! - Host: embedded world host backed by a JSON snapshot
//! - Config: Application configuration
//! - State: Shared application state

pub mod config;
pub mod host;
pub mod persistence;
pub mod state;
