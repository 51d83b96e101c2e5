//! Ports - Boundaries between the plot core and its collaborators

pub mod outbound;
