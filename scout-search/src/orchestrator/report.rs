//! Per-phase and per-run counters.

use std::fmt;

use crate::pacing::PacingStats;

/// What happened during one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Phase name.
    pub name: String,
    /// Searches issued.
    pub terms_issued: usize,
    /// Terms skipped because their text was already issued this run.
    pub terms_skipped: usize,
    /// Searches that returned successfully, empty or not.
    pub searches_ok: usize,
    /// Searches that failed for reasons other than throttling.
    pub search_failures: usize,
    /// Hits returned across all searches.
    pub hits_seen: usize,
    /// Hits whose identity was already accepted or already fetched.
    pub duplicates: usize,
    /// Profile fetches that failed or returned no data.
    pub fetch_failures: usize,
    /// Profiles rejected by the filter.
    pub rejected: usize,
    /// Profiles accepted.
    pub accepted: usize,
    /// Calls answered with a rate-limit signal.
    pub rate_limited: usize,
    /// The phase stopped early because the run was cancelled.
    pub cancelled: bool,
}

impl PhaseReport {
    /// An empty report for the named phase.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every issued search failed and none succeeded. Throttled searches
    /// count as neither.
    pub fn all_searches_failed(&self) -> bool {
        self.search_failures > 0 && self.searches_ok == 0
    }
}

/// What happened during a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One report per executed phase, in order.
    pub phases: Vec<PhaseReport>,
    /// Size of the accepted set at the end of the run.
    pub accepted_total: usize,
    /// The run stopped early because it was cancelled.
    pub cancelled: bool,
    /// The final re-scan found no identity key collisions.
    pub integrity_ok: bool,
    /// Pacing counters at the end of the run.
    pub pacing: PacingStats,
}

impl RunReport {
    /// Searches issued across all phases.
    pub fn terms_issued(&self) -> usize {
        self.phases.iter().map(|p| p.terms_issued).sum()
    }

    /// Rate-limit signals across all phases.
    pub fn rate_limited(&self) -> usize {
        self.phases.iter().map(|p| p.rate_limited).sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phase in &self.phases {
            writeln!(
                f,
                "{:<12} issued {:>4}  hits {:>5}  accepted {:>4}  rejected {:>4}  dupes {:>4}  429s {:>3}{}",
                phase.name,
                phase.terms_issued,
                phase.hits_seen,
                phase.accepted,
                phase.rejected,
                phase.duplicates,
                phase.rate_limited,
                if phase.cancelled { "  (cancelled)" } else { "" },
            )?;
        }
        write!(
            f,
            "total accepted {}  requests {}  waited {:.1}s",
            self.accepted_total,
            self.pacing.requests,
            self.pacing.total_wait.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_searches_failed_ignores_throttling() {
        let mut report = PhaseReport::new("priority");
        report.rate_limited = 3;
        assert!(!report.all_searches_failed());

        report.search_failures = 2;
        assert!(report.all_searches_failed());

        report.searches_ok = 1;
        assert!(!report.all_searches_failed());
    }

    #[test]
    fn run_totals_sum_phases() {
        let mut first = PhaseReport::new("priority");
        first.terms_issued = 2;
        first.rate_limited = 1;
        let mut second = PhaseReport::new("remaining");
        second.terms_issued = 3;
        let report = RunReport {
            phases: vec![first, second],
            accepted_total: 4,
            integrity_ok: true,
            ..Default::default()
        };
        assert_eq!(report.terms_issued(), 5);
        assert_eq!(report.rate_limited(), 1);
        let text = report.to_string();
        assert!(text.contains("priority"));
        assert!(text.contains("total accepted 4"));
    }
}
