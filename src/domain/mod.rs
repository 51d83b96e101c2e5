//! Domain layer - Plots and the world types they live in
//!
//! This layer contains:
//! - Entities: Plot
//! - Value Objects: identifiers, world references, positions and markers, protected regions

pub mod entities;
pub mod value_objects;
