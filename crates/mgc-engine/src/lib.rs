//! Cleaning engine: builds the obfuscator chain from configuration, runs the
//! worker pool over an input tree and assembles the report.

pub mod build;
pub mod pipeline;
pub mod reporter;

pub use build::{load_replacement_file, obfuscators, omitters};
pub use pipeline::{Pipeline, RunOutcome, RunStats};
pub use reporter::Reporter;
