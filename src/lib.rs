// Library exports for the binary and integration tests

pub mod breakpoints;
pub mod config;
pub mod cue_sheet;
pub mod discovery;
pub mod encoding;
pub mod error;
pub mod extraction;
pub mod partition;
pub mod pipeline;
pub mod source;
pub mod tagging;
pub mod tools;
pub mod transcode;
pub mod workspace;

pub use error::{CueTagError, Result};
pub use pipeline::{Pipeline, RunOptions, RunReport, Toolchain};
