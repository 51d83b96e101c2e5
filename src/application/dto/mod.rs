//! Data transfer objects crossing the persistence boundary

mod plot_record;

pub use plot_record::PlotRecord;
