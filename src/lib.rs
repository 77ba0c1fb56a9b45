//! Scout: adaptive, rate-aware profile discovery.
//!
//! The scheduling core lives in the `scout-search` crate. This crate adds
//! the TOML configuration file, external name corpora, file export, and
//! the `scout` command-line binary.

pub mod app;
pub mod config;
pub mod error;
pub mod export;

pub use app::{RunOptions, RunOutcome, Scout};
pub use config::{CorpusConfig, ExportConfig, ExportFormat, ScoutConfig, load_corpus};
pub use error::{Result, ScoutError};
pub use export::{ExportSet, JsonLinesSink, JsonSink};
