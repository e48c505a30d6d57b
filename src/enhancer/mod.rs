pub mod indicators;
pub mod keywords;
pub mod quality;

pub use quality::{EnhanceError, SignalEnhancer};
