//! Domain entities - Core business objects with identity

mod plot;

pub use plot::{Plot, ValidationError, MARKER_HEADER};
