pub mod api;
pub mod config;
pub mod correlator;
pub mod detector;
pub mod engine;
pub mod enhancer;
pub mod error;
pub mod pipeline;
pub mod ranker;
pub mod state;
pub mod stats;
pub mod types;
pub mod window;

pub use engine::OpportunityEngine;
pub use error::{AppError, Result};
pub use pipeline::{Pipeline, PipelineHandle, SignalSender};
