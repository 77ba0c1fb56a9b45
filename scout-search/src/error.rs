//! Error types for the scout-search crate.
//!
//! Per-item failures ([`SearchError::RateLimited`], [`SearchError::Timeout`],
//! [`SearchError::Http`], [`SearchError::Parse`], [`SearchError::Auth`]) are
//! recovered inside the orchestrator. Only configuration and whole-phase
//! failures propagate out of a run. Session credentials never appear in
//! error messages.

/// Errors that can occur while scheduling and issuing searches.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The remote service signalled throttling (HTTP 429 or equivalent).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A collaborator call did not complete within the per-call timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// An HTTP request failed or returned an unexpected status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The remote service rejected the session credentials.
    #[error("auth error: {0}")]
    Auth(String),

    /// Invalid scheduler or strategy configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Every search issued during a phase failed.
    #[error("phase '{phase}' failed: {failures} searches failed and none succeeded")]
    PhaseFailed {
        /// Name of the failed phase.
        phase: String,
        /// Number of failed searches in the phase.
        failures: usize,
    },

    /// A result sink could not persist records.
    #[error("export error: {0}")]
    Export(String),
}

impl SearchError {
    /// Returns `true` for the throttling signal, which is absorbed as a
    /// pacing signal rather than counted as a failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Convenience type alias for scout-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
