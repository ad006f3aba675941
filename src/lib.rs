pub mod analyzers;
pub mod animation;
pub mod error;
pub mod loader;
pub mod output;
pub mod parser;
pub mod records;
pub mod stats;

pub use error::{PipelineError, Result};
