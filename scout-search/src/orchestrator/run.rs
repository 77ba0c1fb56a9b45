//! The sequential phase/term/hit control loop.
//!
//! # Pipeline
//!
//! For every phase, in order:
//!
//! 1. Skip terms whose text was already issued this run
//! 2. Wait on the rate controller, then search the term
//! 3. Feed the measured outcome back into the rate controller
//! 4. For each hit not already accepted or fetched, wait on the rate
//!    controller at [`Priority::High`] and fetch the full profile
//! 5. Offer the profile to the dedup/filter pipeline
//!
//! Rate-limited and failed calls are never retried within a run. Only
//! configuration errors and whole-phase failure propagate out.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{ProfileClient, SearchClient};
use crate::config::{RunConfig, SchedulerConfig};
use crate::error::SearchError;
use crate::pacing::RateController;
use crate::pipeline::{dedup_key, Admission, DedupFilterPipeline};
use crate::sink::ResultSink;
use crate::types::{AcceptedRecord, Phase, Priority, ResponseFeedback, ResponseStatus, Term};

use super::progress::{ProgressCallback, ProgressEvent};
use super::report::{PhaseReport, RunReport};

/// Drives phases of search terms through the rate controller, the
/// collaborators, and the dedup/filter pipeline.
///
/// One orchestrator is one run: it owns the run's single
/// [`RateController`], the accepted set, and the set of issued terms.
pub struct SearchOrchestrator<S, P> {
    search: S,
    profiles: P,
    pacer: RateController,
    pipeline: DedupFilterPipeline,
    run: RunConfig,
    issued: HashSet<String>,
    fetched: HashSet<String>,
    cancel: CancellationToken,
    checkpoint: Option<Box<dyn ResultSink>>,
    progress: Option<ProgressCallback>,
}

impl<S: SearchClient, P: ProfileClient> SearchOrchestrator<S, P> {
    /// Create an orchestrator for one run.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid.
    pub fn new(config: &SchedulerConfig, search: S, profiles: P) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            search,
            profiles,
            pacer: RateController::new(config.pacing.clone()),
            pipeline: DedupFilterPipeline::new(&config.filter),
            run: config.run.clone(),
            issued: HashSet::new(),
            fetched: HashSet::new(),
            cancel: CancellationToken::new(),
            checkpoint: None,
            progress: None,
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Hand the accepted set to `sink` after every phase.
    pub fn with_checkpoint_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.checkpoint = Some(sink);
        self
    }

    /// Report progress through `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// A handle that cancels this run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The run's rate controller.
    pub fn pacer(&self) -> &RateController {
        &self.pacer
    }

    /// The run's dedup/filter pipeline.
    pub fn pipeline(&self) -> &DedupFilterPipeline {
        &self.pipeline
    }

    /// Records accepted so far, in acceptance order.
    pub fn records(&self) -> &[AcceptedRecord] {
        self.pipeline.records()
    }

    /// Consume the orchestrator, returning the accepted records.
    pub fn into_records(self) -> Vec<AcceptedRecord> {
        self.pipeline.into_records()
    }

    /// Check that the session yields results before committing to a run.
    ///
    /// Probes are searched in order at [`Priority::High`] and go through
    /// the rate controller like any other request. Returns `true` on the
    /// first probe that returns at least one hit.
    pub async fn verify_session(&mut self, probe_terms: &[String]) -> bool {
        for term in probe_terms {
            if !self.gate(Priority::High).await {
                return false;
            }
            let (outcome, elapsed) =
                timed(self.run.request_timeout(), self.search.search(term, Priority::High)).await;
            self.pacer
                .after_response(&feedback(outcome.as_ref().map(Vec::len), elapsed));
            match outcome {
                Ok(hits) if !hits.is_empty() => {
                    tracing::info!(probe = %term, hits = hits.len(), "session verified");
                    return true;
                }
                Ok(_) => tracing::debug!(probe = %term, "probe returned no hits"),
                Err(e) => tracing::warn!(probe = %term, error = %e, "probe failed"),
            }
        }
        tracing::warn!(probes = probe_terms.len(), "no probe returned results");
        false
    }

    /// Run every phase in order, pausing between phases.
    ///
    /// Phases with no terms are skipped. Cancellation stops the run at the
    /// next boundary and still returns a report.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::PhaseFailed`] if every search in a phase
    /// failed. Records accepted before the failure stay available through
    /// [`Self::records`].
    pub async fn run_all(&mut self, phases: &[Phase]) -> Result<RunReport, SearchError> {
        let mut report = RunReport::default();
        let mut ran_any = false;

        for phase in phases {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if phase.is_empty() {
                tracing::debug!(phase = %phase.name, "skipping empty phase");
                continue;
            }
            if ran_any && !self.pause_between_phases().await {
                report.cancelled = true;
                break;
            }
            ran_any = true;

            let phase_report = self.run_phase(phase).await?;
            let cancelled = phase_report.cancelled;
            report.phases.push(phase_report);
            self.write_checkpoint(&phase.name);

            if cancelled {
                report.cancelled = true;
                break;
            }
        }

        report.accepted_total = self.pipeline.records().len();
        report.integrity_ok = self.pipeline.accepted().verify_unique();
        report.pacing = self.pacer.stats();

        if !report.integrity_ok {
            tracing::error!(
                collisions = ?self.pipeline.accepted().collisions(),
                "accepted set contains duplicate identities"
            );
        }
        tracing::info!(
            accepted = report.accepted_total,
            requests = report.pacing.requests,
            rate_limited = report.pacing.rate_limited,
            cancelled = report.cancelled,
            "run finished"
        );
        Ok(report)
    }

    /// Run a single phase.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::PhaseFailed`] if at least one search was
    /// issued and all of them failed. Throttled searches are not failures.
    pub async fn run_phase(&mut self, phase: &Phase) -> Result<PhaseReport, SearchError> {
        let mut report = PhaseReport::new(&phase.name);
        tracing::info!(
            phase = %phase.name,
            priority = %phase.priority,
            terms = phase.terms.len(),
            "phase started"
        );
        self.emit(ProgressEvent::PhaseStarted {
            name: phase.name.clone(),
            priority: phase.priority,
            terms: phase.terms.len(),
        });

        for term in &phase.terms {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if !self.issued.insert(term.text.clone()) {
                tracing::debug!(term = %term.text, "term already issued this run");
                report.terms_skipped += 1;
                continue;
            }
            if !self.run_term(term, &mut report).await {
                report.cancelled = true;
                break;
            }
        }

        tracing::info!(
            phase = %phase.name,
            issued = report.terms_issued,
            accepted = report.accepted,
            rejected = report.rejected,
            duplicates = report.duplicates,
            rate_limited = report.rate_limited,
            "phase finished"
        );
        self.emit(ProgressEvent::PhaseFinished {
            name: phase.name.clone(),
            accepted: report.accepted,
        });

        if !report.cancelled && report.all_searches_failed() {
            return Err(SearchError::PhaseFailed {
                phase: phase.name.clone(),
                failures: report.search_failures,
            });
        }
        Ok(report)
    }

    /// Search one term and process its hits. Returns `false` if the run
    /// was cancelled part way through.
    async fn run_term(&mut self, term: &Term, report: &mut PhaseReport) -> bool {
        if !self.gate(term.priority).await {
            return false;
        }
        tracing::trace!(term = %term.text, priority = %term.priority, "searching");
        let (outcome, elapsed) = timed(
            self.run.request_timeout(),
            self.search.search(&term.text, term.priority),
        )
        .await;
        self.pacer
            .after_response(&feedback(outcome.as_ref().map(Vec::len), elapsed));
        report.terms_issued += 1;

        let hits = match outcome {
            Ok(hits) => {
                report.searches_ok += 1;
                hits
            }
            Err(e) if e.is_rate_limited() => {
                report.rate_limited += 1;
                tracing::warn!(term = %term.origin_label, "search rate limited, moving on");
                self.finish_term(term, 0);
                return true;
            }
            Err(e) => {
                report.search_failures += 1;
                tracing::warn!(term = %term.origin_label, error = %e, "search failed");
                self.finish_term(term, 0);
                return true;
            }
        };

        report.hits_seen += hits.len();
        let hit_count = hits.len();

        for hit in hits {
            if self.cancel.is_cancelled() {
                return false;
            }
            let key = dedup_key(&hit.identity);
            if self.pipeline.is_known(&hit.identity) || self.fetched.contains(&key) {
                report.duplicates += 1;
                continue;
            }
            if !self.gate(Priority::High).await {
                return false;
            }

            let (outcome, elapsed) =
                timed(self.run.request_timeout(), self.profiles.fetch(&hit.identity)).await;
            self.pacer.after_response(&feedback(
                outcome.as_ref().map(|p| usize::from(p.is_some())),
                elapsed,
            ));

            match outcome {
                Ok(Some(profile)) => {
                    self.fetched.insert(key);
                    let identity = profile.identity.clone();
                    match self.pipeline.admit(profile, &term.origin_label) {
                        Admission::Accepted => {
                            report.accepted += 1;
                            tracing::debug!(%identity, origin = %term.origin_label, "accepted");
                            self.emit(ProgressEvent::ProfileAccepted {
                                identity,
                                origin_label: term.origin_label.clone(),
                            });
                        }
                        Admission::Duplicate => report.duplicates += 1,
                        Admission::Rejected(verdict) => {
                            report.rejected += 1;
                            tracing::debug!(%identity, reason = %verdict.reason, "rejected");
                        }
                    }
                }
                Ok(None) => {
                    self.fetched.insert(key);
                    report.fetch_failures += 1;
                    tracing::debug!(identity = %hit.identity, "no profile data");
                }
                Err(e) if e.is_rate_limited() => {
                    report.rate_limited += 1;
                    tracing::warn!(identity = %hit.identity, "profile fetch rate limited");
                }
                Err(e) => {
                    report.fetch_failures += 1;
                    tracing::debug!(identity = %hit.identity, error = %e, "profile fetch failed");
                }
            }
        }

        self.finish_term(term, hit_count);
        true
    }

    /// Every issued term ends with exactly one `TermFinished`, whatever
    /// the search outcome.
    fn finish_term(&self, term: &Term, hits: usize) {
        self.emit(ProgressEvent::TermFinished {
            origin_label: term.origin_label.clone(),
            hits,
            accepted_total: self.pipeline.records().len(),
        });
    }

    /// Wait for permission to send. Returns `false` if cancelled while
    /// waiting.
    async fn gate(&mut self, priority: Priority) -> bool {
        if let Some(remaining) = self.pacer.cooldown_remaining() {
            self.emit(ProgressEvent::Cooldown { remaining });
        }
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            _ = self.pacer.before_request(priority) => true,
        }
    }

    /// Sleep for the inter-phase pause. Returns `false` if cancelled.
    async fn pause_between_phases(&mut self) -> bool {
        let duration = self.run.inter_phase_pause();
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tracing::info!(pause_ms = duration.as_millis() as u64, "pausing between phases");
        self.emit(ProgressEvent::Pausing { duration });
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    fn write_checkpoint(&self, phase: &str) {
        let Some(sink) = &self.checkpoint else {
            return;
        };
        match sink.export(self.pipeline.records()) {
            Ok(locations) => {
                tracing::info!(
                    phase,
                    ?locations,
                    records = self.pipeline.records().len(),
                    "checkpoint written"
                );
            }
            Err(e) => tracing::warn!(phase, error = %e, "checkpoint failed"),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}

/// Run `call` under a timeout, measuring how long it took.
async fn timed<T, F>(limit: Duration, call: F) -> (Result<T, SearchError>, Duration)
where
    F: Future<Output = Result<T, SearchError>>,
{
    let started = Instant::now();
    let outcome = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout(format!(
            "no response within {}ms",
            limit.as_millis()
        ))),
    };
    (outcome, started.elapsed())
}

/// Classify a call outcome for the rate controller.
fn feedback(outcome: Result<usize, &SearchError>, elapsed: Duration) -> ResponseFeedback {
    match outcome {
        Ok(count) => ResponseFeedback::success(count, elapsed),
        Err(SearchError::RateLimited(_)) => {
            ResponseFeedback::with_status(ResponseStatus::RateLimited, elapsed)
        }
        Err(SearchError::Timeout(_)) => {
            ResponseFeedback::with_status(ResponseStatus::TimedOut, elapsed)
        }
        Err(_) => ResponseFeedback::with_status(ResponseStatus::Failed, elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_classifies_outcomes() {
        let t = Duration::from_millis(300);
        assert_eq!(feedback(Ok(3), t).status, ResponseStatus::Ok);
        assert_eq!(feedback(Ok(0), t).status, ResponseStatus::Empty);
        assert_eq!(
            feedback(Err(&SearchError::RateLimited("429".into())), t).status,
            ResponseStatus::RateLimited
        );
        assert_eq!(
            feedback(Err(&SearchError::Timeout("slow".into())), t).status,
            ResponseStatus::TimedOut
        );
        assert_eq!(
            feedback(Err(&SearchError::Parse("bad json".into())), t).status,
            ResponseStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_reports_timeout() {
        let (outcome, elapsed) = timed(Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, SearchError>(1)
        })
        .await;
        assert!(matches!(outcome, Err(SearchError::Timeout(_))));
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_measures_elapsed() {
        let (outcome, elapsed) = timed(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            Ok::<_, SearchError>("done")
        })
        .await;
        assert_eq!(outcome.ok(), Some("done"));
        assert_eq!(elapsed, Duration::from_millis(1_200));
    }
}
