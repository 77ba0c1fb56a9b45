//! Search orchestrator: the sequential control loop of a discovery run.
//!
//! Phases run strictly in order, terms within a phase strictly in order,
//! and hits within a term in the order the search collaborator returned
//! them. Every outbound call is gated by the run's single rate controller.

pub mod progress;
pub mod report;
pub mod run;

pub use progress::{ProgressCallback, ProgressEvent};
pub use report::{PhaseReport, RunReport};
pub use run::SearchOrchestrator;
