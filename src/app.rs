//! Application wiring: config → phases → orchestrator → export.

use std::path::PathBuf;
use std::sync::Arc;

use scout_search::clients::HttpApiClient;
use scout_search::{
    AcceptedRecord, PhasePlan, ProfileClient, ProgressCallback, ResultSink, RunReport,
    SearchClient, SearchOrchestrator, generate_phases, plan_summary,
};
use tokio_util::sync::CancellationToken;

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::export::ExportSet;

/// Options for a single run.
#[derive(Default)]
pub struct RunOptions {
    /// Write output here instead of the configured directory.
    pub output_dir: Option<PathBuf>,
    /// Cancels the run at the next boundary.
    pub cancel: CancellationToken,
    /// Receives progress events.
    pub progress: Option<ProgressCallback>,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-phase counters.
    pub report: RunReport,
    /// Accepted records in acceptance order.
    pub records: Vec<AcceptedRecord>,
    /// Paths of the exported files.
    pub exported: Vec<String>,
}

/// A configured scout application.
#[derive(Debug, Clone)]
pub struct Scout {
    config: ScoutConfig,
}

impl Scout {
    /// Validate `config` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn new(config: ScoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The wrapped configuration.
    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Generate the phase plan without issuing any request.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus cannot be loaded or yields no terms.
    pub fn plan(&self) -> Result<Vec<PhasePlan>> {
        let scheduler = self.config.resolved_scheduler()?;
        let phases = generate_phases(&scheduler.strategy)?;
        Ok(plan_summary(&phases))
    }

    /// Check that the configured session yields search results.
    ///
    /// Uses `probes` when given, else the configured probe terms.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn check(&self, probes: &[String]) -> Result<bool> {
        let api = Arc::new(HttpApiClient::new(&self.config.api)?);
        let probes = if probes.is_empty() {
            self.config.scheduler.run.probe_terms.as_slice()
        } else {
            probes
        };
        let mut orchestrator =
            SearchOrchestrator::new(&self.config.scheduler, Arc::clone(&api), api)?;
        Ok(orchestrator.verify_session(probes).await)
    }

    /// Run against the configured HTTP service and export the results.
    ///
    /// # Errors
    ///
    /// Corpus, config and session-check failures abort before any search
    /// is issued. A whole-phase failure aborts the run after exporting
    /// whatever was accepted so far.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome> {
        let api = Arc::new(HttpApiClient::new(&self.config.api)?);
        self.run_with(Arc::clone(&api), api, options).await
    }

    /// Run with caller-supplied collaborators.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`].
    pub async fn run_with<S, P>(
        &self,
        search: S,
        profiles: P,
        options: RunOptions,
    ) -> Result<RunOutcome>
    where
        S: SearchClient,
        P: ProfileClient,
    {
        let scheduler = self.config.resolved_scheduler()?;
        let phases = generate_phases(&scheduler.strategy)?;
        let output_dir = options.output_dir.as_deref();

        let mut orchestrator = SearchOrchestrator::new(&scheduler, search, profiles)?
            .with_cancellation(options.cancel);
        if let Some(progress) = options.progress {
            orchestrator = orchestrator.with_progress(progress);
        }
        if scheduler.run.checkpoint_each_phase {
            orchestrator = orchestrator.with_checkpoint_sink(Box::new(ExportSet::checkpoint(
                &self.config.export,
                output_dir,
            )));
        }

        let probes = &scheduler.run.probe_terms;
        if !probes.is_empty() && !orchestrator.verify_session(probes).await {
            if orchestrator.cancellation_token().is_cancelled() {
                tracing::info!("cancelled during session check");
                return Ok(RunOutcome {
                    report: RunReport {
                        cancelled: true,
                        integrity_ok: true,
                        pacing: orchestrator.pacer().stats(),
                        ..Default::default()
                    },
                    records: Vec::new(),
                    exported: Vec::new(),
                });
            }
            return Err(ScoutError::Auth(
                "session check failed: no probe term returned results".into(),
            ));
        }

        let outcome = orchestrator.run_all(&phases).await;
        let records = orchestrator.into_records();
        let sink = ExportSet::from_config(&self.config.export, output_dir);

        match outcome {
            Ok(report) => {
                let exported = sink
                    .export(&records)
                    .map_err(|e| ScoutError::Export(e.to_string()))?;
                tracing::info!(records = records.len(), files = ?exported, "export complete");
                Ok(RunOutcome {
                    report,
                    records,
                    exported,
                })
            }
            Err(e) => {
                if !records.is_empty() {
                    match sink.export(&records) {
                        Ok(files) => tracing::warn!(
                            records = records.len(),
                            ?files,
                            "run aborted; partial results exported"
                        ),
                        Err(export_err) => tracing::warn!(
                            error = %export_err,
                            "run aborted and partial export failed"
                        ),
                    }
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use scout_search::{Priority, Strategy};

    #[test]
    fn plan_lists_phases_in_order() {
        let scout = Scout::new(ScoutConfig::default()).unwrap();
        let plan = scout.plan().unwrap();
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["priority", "remaining", "broad"]);
        assert_eq!(plan[0].priority, Priority::High);
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let mut config = ScoutConfig::default();
        config.scheduler.strategy = Strategy::AdHoc {
            terms: vec![],
            priority: Priority::Medium,
        };
        assert!(Scout::new(config).is_err());
    }

    #[test]
    fn missing_corpus_fails_plan() {
        let mut config = ScoutConfig::default();
        config.corpus.names_file = Some(PathBuf::from("/nonexistent/names.txt"));
        let scout = Scout::new(config).unwrap();
        assert!(matches!(scout.plan(), Err(ScoutError::Corpus(_))));
    }
}
