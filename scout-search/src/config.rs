//! Scheduler configuration with sensible defaults.
//!
//! [`SchedulerConfig`] controls request pacing, the profile filter, the term
//! generation strategy, and the run-level pauses and timeouts. The defaults
//! are tuned for a slow, polite crawl of a service that throttles at roughly
//! twenty requests per minute.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::strategy::Strategy;

/// Top-level configuration for a discovery run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Adaptive pacing bounds and adjustment steps.
    pub pacing: PacingConfig,
    /// Profile acceptance rules.
    pub filter: FilterConfig,
    /// How search terms are generated.
    pub strategy: Strategy,
    /// Run-level behaviour between phases and per call.
    pub run: RunConfig,
}

/// Pacing parameters for the rate controller. All durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Initial dynamic delay and the base for priority spacing.
    pub base_delay_ms: u64,
    /// Lower clamp for the dynamic delay.
    pub min_delay_ms: u64,
    /// Upper clamp for the dynamic delay.
    pub max_delay_ms: u64,
    /// Subtracted from the base for high priority, added for low priority.
    pub priority_offset_ms: u64,
    /// Request ceiling within the sliding 60-second window.
    pub max_requests_per_minute: usize,
    /// Multiplier applied to the dynamic delay on a rate-limit signal.
    pub rate_limit_growth: f64,
    /// Fixed increment added to the dynamic delay on a rate-limit signal.
    pub rate_limit_increment_ms: u64,
    /// Cooldown length applied on the first rate-limit signal.
    pub initial_backoff_ms: u64,
    /// Multiplier applied to the backoff after each rate-limit signal.
    pub backoff_growth: f64,
    /// Delay increase when the window ceiling is exceeded.
    pub density_step_ms: u64,
    /// Responses slower than this raise the delay.
    pub slow_response_ms: u64,
    /// Delay increase for a slow response.
    pub slow_step_ms: u64,
    /// Responses faster than this lower the delay.
    pub fast_response_ms: u64,
    /// Delay decrease for a fast response.
    pub fast_step_ms: u64,
    /// Consecutive empty responses that trigger a speed-up.
    pub empty_streak_threshold: u32,
    /// Delay decrease when the empty streak threshold is reached.
    pub empty_streak_reduction_ms: u64,
    /// Delay decrease after any non-empty response.
    pub success_nudge_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 3_000,
            min_delay_ms: 1_500,
            max_delay_ms: 15_000,
            priority_offset_ms: 1_000,
            max_requests_per_minute: 20,
            rate_limit_growth: 1.5,
            rate_limit_increment_ms: 2_000,
            initial_backoff_ms: 10_000,
            backoff_growth: 1.5,
            density_step_ms: 500,
            slow_response_ms: 4_000,
            slow_step_ms: 500,
            fast_response_ms: 800,
            fast_step_ms: 200,
            empty_streak_threshold: 5,
            empty_streak_reduction_ms: 300,
            success_nudge_ms: 50,
        }
    }
}

impl PacingConfig {
    /// Largest cooldown the backoff may grow to: four times the max delay.
    pub fn max_backoff_ms(&self) -> u64 {
        self.max_delay_ms.saturating_mul(4)
    }

    /// Validates pacing bounds and growth factors.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_delay_ms == 0 {
            return Err(SearchError::Config(
                "max_delay_ms must be greater than 0".into(),
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(SearchError::Config(
                "min_delay_ms must be <= max_delay_ms".into(),
            ));
        }
        if self.base_delay_ms < self.min_delay_ms || self.base_delay_ms > self.max_delay_ms {
            return Err(SearchError::Config(
                "base_delay_ms must lie within [min_delay_ms, max_delay_ms]".into(),
            ));
        }
        if self.max_requests_per_minute == 0 {
            return Err(SearchError::Config(
                "max_requests_per_minute must be greater than 0".into(),
            ));
        }
        if [self.rate_limit_growth, self.backoff_growth]
            .iter()
            .any(|g| g.is_nan() || *g < 1.0)
        {
            return Err(SearchError::Config(
                "rate_limit_growth and backoff_growth must be >= 1.0".into(),
            ));
        }
        if self.fast_response_ms >= self.slow_response_ms {
            return Err(SearchError::Config(
                "fast_response_ms must be < slow_response_ms".into(),
            ));
        }
        if self.empty_streak_threshold == 0 {
            return Err(SearchError::Config(
                "empty_streak_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Keyword sets keyed by language or script name, e.g. `"english"`.
pub type KeywordSets = BTreeMap<String, Vec<String>>;

/// Profile acceptance rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Reject private profiles.
    pub require_public: bool,
    /// Reject profiles with fewer followers than this.
    pub min_followers: u64,
    /// Biography must contain at least one of these (any language).
    pub include: KeywordSets,
    /// Biography must contain none of these (any language).
    pub exclude: KeywordSets,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let mut include = KeywordSets::new();
        include.insert(
            "english".into(),
            vec![
                "coach".into(),
                "trainer".into(),
                "fitness".into(),
                "workout".into(),
            ],
        );
        include.insert(
            "arabic".into(),
            vec!["مدرب".into(), "كوتش".into(), "لياقة".into()],
        );
        Self {
            require_public: true,
            min_followers: 0,
            include,
            exclude: KeywordSets::new(),
        }
    }
}

/// Run-level behaviour: pauses, timeouts, checkpoints, session probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause inserted between phases so windowed counters can decay.
    pub inter_phase_pause_ms: u64,
    /// Upper bound for any single collaborator call.
    pub request_timeout_ms: u64,
    /// Hand the accepted set to the sink after every phase.
    pub checkpoint_each_phase: bool,
    /// Terms used to check that the session yields results.
    pub probe_terms: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inter_phase_pause_ms: 60_000,
            request_timeout_ms: 20_000,
            checkpoint_each_phase: false,
            probe_terms: vec!["fitness".into()],
        }
    }
}

impl RunConfig {
    /// The inter-phase pause as a [`Duration`].
    pub fn inter_phase_pause(&self) -> Duration {
        Duration::from_millis(self.inter_phase_pause_ms)
    }

    /// The per-call timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl SchedulerConfig {
    /// Validates this configuration, returning an error naming the first
    /// invalid field.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.pacing.validate()?;
        if self.run.request_timeout_ms == 0 {
            return Err(SearchError::Config(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }
        self.strategy.validate()
    }
}
