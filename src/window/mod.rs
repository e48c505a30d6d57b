pub mod aggregator;
pub mod rolling;

pub use aggregator::WindowAggregator;
pub use rolling::{cutoff_before, Window, WindowSnapshot, WindowStats};
