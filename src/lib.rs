//! Plotkeeper - Per-world land plot registry
//!
//! A plot is a named, owned claim over a protected region of a game world,
//! anchored to a sign. Plotkeeper:
//! - Keeps exactly one plot registry per active world, loaded lazily from disk
//! - Evicts plots whose sign or region has disappeared from the world
//! - Re-applies plot state to the world host in a daily maintenance sweep
//! - Flushes every registry back to its JSON file on demand

pub mod application;
pub mod domain;
pub mod infrastructure;
