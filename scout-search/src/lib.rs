//! # scout-search
//!
//! Adaptive search scheduler for profile discovery against a rate-limited,
//! text-search-only service.
//!
//! The service offers no "list everyone matching X" operation, only a
//! search endpoint returning a handful of accounts per query. Coverage
//! comes from issuing many queries while staying under an undocumented
//! rate ceiling.
//!
//! ## Design
//!
//! - [`strategy`] turns a name corpus and keyword tiers into ordered phases
//!   of prioritized search terms
//! - [`pacing::RateController`] decides how long to wait before each
//!   request and adapts to 429s, latency, window density and empty results
//! - [`orchestrator::SearchOrchestrator`] walks phases and terms, fetches
//!   full profiles for new hits, and feeds every outcome back into pacing
//! - [`pipeline::DedupFilterPipeline`] filters profiles on biography
//!   keywords and keeps the accepted set unique by case-folded identity
//!
//! Everything is sequential: one request in flight at a time, every one
//! of them gated by the same controller.
//!
//! ## Security
//!
//! - Session credentials are never logged or included in errors
//! - Search terms are logged only at trace level

pub mod client;
pub mod clients;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pacing;
pub mod pipeline;
pub mod sink;
pub mod strategy;
pub mod types;

pub use client::{ProfileClient, SearchClient};
pub use config::{FilterConfig, KeywordSets, PacingConfig, RunConfig, SchedulerConfig};
pub use error::{Result, SearchError};
pub use orchestrator::{
    PhaseReport, ProgressCallback, ProgressEvent, RunReport, SearchOrchestrator,
};
pub use pacing::{PacingStats, RateController};
pub use pipeline::{filter, Admission, DedupFilterPipeline};
pub use sink::{MemorySink, ResultSink};
pub use strategy::{generate_phases, plan_summary, KeywordTiers, PhasePlan, Strategy};
pub use types::{
    AcceptedRecord, FilterVerdict, Phase, Priority, Profile, RawHit, ResponseFeedback,
    ResponseStatus, Term,
};

/// Generate phases from `config.strategy` and run them all.
///
/// Returns the run report together with the accepted records.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid configuration and
/// [`SearchError::PhaseFailed`] if every search in some phase failed.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example() -> scout_search::Result<()> {
/// use scout_search::clients::{ApiConfig, HttpApiClient};
///
/// let api = Arc::new(HttpApiClient::new(&ApiConfig::default())?);
/// let config = scout_search::SchedulerConfig::default();
/// let (report, records) = scout_search::run(&config, Arc::clone(&api), api).await?;
/// println!("{report}");
/// for record in &records {
///     println!("{} ({})", record.profile.identity, record.origin_label);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run<S, P>(
    config: &SchedulerConfig,
    search: S,
    profiles: P,
) -> Result<(RunReport, Vec<AcceptedRecord>)>
where
    S: SearchClient,
    P: ProfileClient,
{
    let phases = generate_phases(&config.strategy)?;
    let mut orchestrator = SearchOrchestrator::new(config, search, profiles)?;
    let report = orchestrator.run_all(&phases).await?;
    Ok((report, orchestrator.into_records()))
}
