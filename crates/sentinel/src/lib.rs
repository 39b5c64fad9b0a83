//! sentinel: the engine that ties analysis, watching and the live channel
//! together, plus report rendering for the command line.

pub mod engine;
pub mod report;

pub use engine::{Engine, EngineCore};
