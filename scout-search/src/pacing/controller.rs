//! The rate controller: dynamic delay, cooldown, and the sliding window.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};

use crate::config::PacingConfig;
use crate::types::{Priority, ResponseFeedback, ResponseStatus};

/// Length of the sliding request-count window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Mutable pacing state. Created once per orchestrator and kept for the
/// whole run; phases do not reset it.
#[derive(Debug, Clone)]
pub struct RateState {
    /// Current inter-request spacing, clamped to the configured bounds.
    pub dynamic_delay_ms: u64,
    /// While in the future, every request waits regardless of priority.
    pub cooldown_until: Option<Instant>,
    /// Completion times of requests within the last [`WINDOW`].
    pub recent_requests: VecDeque<Instant>,
    /// Consecutive zero-result responses.
    pub empty_result_streak: u32,
    /// Cooldown length applied on the next rate-limit signal.
    pub current_backoff_ms: u64,
}

/// Counters for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacingStats {
    /// Requests released by [`RateController::before_request`].
    pub requests: u64,
    /// Rate-limit signals recorded.
    pub rate_limited: u64,
    /// Total time spent suspended before requests.
    pub total_wait: Duration,
}

/// Paces outbound requests against an evolving model of the remote
/// service's tolerance.
#[derive(Debug)]
pub struct RateController {
    config: PacingConfig,
    state: RateState,
    last_request_at: Option<Instant>,
    stats: PacingStats,
}

impl RateController {
    /// Create a controller with the dynamic delay starting at the base.
    pub fn new(config: PacingConfig) -> Self {
        let dynamic_delay_ms = config
            .base_delay_ms
            .clamp(config.min_delay_ms, config.max_delay_ms);
        let current_backoff_ms = config.initial_backoff_ms.min(config.max_backoff_ms());
        Self {
            state: RateState {
                dynamic_delay_ms,
                cooldown_until: None,
                recent_requests: VecDeque::new(),
                empty_result_streak: 0,
                current_backoff_ms,
            },
            config,
            last_request_at: None,
            stats: PacingStats::default(),
        }
    }

    /// The current pacing state.
    pub fn state(&self) -> &RateState {
        &self.state
    }

    /// The pacing configuration.
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> PacingStats {
        self.stats
    }

    /// The current dynamic delay.
    pub fn dynamic_delay(&self) -> Duration {
        Duration::from_millis(self.state.dynamic_delay_ms)
    }

    /// Time left on an active cooldown, if any.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let until = self.state.cooldown_until?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    /// Requests recorded within the sliding window, as of now.
    pub fn requests_in_window(&self) -> usize {
        let now = Instant::now();
        self.state
            .recent_requests
            .iter()
            .filter(|at| now.duration_since(**at) < WINDOW)
            .count()
    }

    /// Static spacing for a priority: high subtracts the offset (floored at
    /// the minimum), low adds it (capped at the maximum).
    pub fn base_for_priority(&self, priority: Priority) -> u64 {
        let base = self.config.base_delay_ms;
        let offset = self.config.priority_offset_ms;
        match priority {
            Priority::High => base.saturating_sub(offset).max(self.config.min_delay_ms),
            Priority::Medium => base,
            Priority::Low => base.saturating_add(offset).min(self.config.max_delay_ms),
        }
    }

    /// Suspend until it is safe to send a request of the given priority.
    ///
    /// An active cooldown is waited out first, then the spacing target
    /// `max(dynamic delay, base for priority)` is enforced relative to the
    /// previous request. Returns how long the caller was suspended.
    pub async fn before_request(&mut self, priority: Priority) -> Duration {
        let started = Instant::now();

        if let Some(until) = self.state.cooldown_until {
            if started < until {
                tracing::debug!(
                    remaining_ms = (until - started).as_millis() as u64,
                    "waiting out cooldown"
                );
                sleep_until(until).await;
            }
        }

        let target = Duration::from_millis(
            self.state
                .dynamic_delay_ms
                .max(self.base_for_priority(priority)),
        );
        if let Some(last) = self.last_request_at {
            let elapsed = Instant::now().duration_since(last);
            if let Some(remaining) = target.checked_sub(elapsed) {
                sleep(remaining).await;
            }
        }

        let now = Instant::now();
        self.last_request_at = Some(now);
        let waited = now.duration_since(started);
        self.stats.requests += 1;
        self.stats.total_wait += waited;
        waited
    }

    /// Fold a response outcome into the pacing state.
    ///
    /// Order of adjustment: window bookkeeping, rate-limit path (which
    /// stops there), window density, latency, then the empty-streak or
    /// success nudge. Each step clamps the delay.
    pub fn after_response(&mut self, feedback: &ResponseFeedback) {
        let now = Instant::now();
        self.state.recent_requests.push_back(now);
        while let Some(oldest) = self.state.recent_requests.front() {
            if now.duration_since(*oldest) >= WINDOW {
                self.state.recent_requests.pop_front();
            } else {
                break;
            }
        }

        if feedback.status == ResponseStatus::RateLimited {
            self.record_rate_limit(now);
            return;
        }

        if self.state.recent_requests.len() > self.config.max_requests_per_minute {
            self.raise(self.config.density_step_ms);
            tracing::debug!(
                window = self.state.recent_requests.len(),
                delay_ms = self.state.dynamic_delay_ms,
                "request density above ceiling, slowing down"
            );
        }

        let response_ms = feedback.response_time.as_millis() as u64;
        if response_ms > self.config.slow_response_ms {
            self.raise(self.config.slow_step_ms);
        } else if response_ms < self.config.fast_response_ms {
            self.lower(self.config.fast_step_ms);
        }

        match feedback.status {
            ResponseStatus::Empty => {
                self.state.empty_result_streak += 1;
                if self.state.empty_result_streak >= self.config.empty_streak_threshold {
                    self.lower(self.config.empty_streak_reduction_ms);
                    self.state.empty_result_streak = 0;
                    tracing::debug!(
                        delay_ms = self.state.dynamic_delay_ms,
                        "empty-result streak, speeding up"
                    );
                }
            }
            ResponseStatus::Ok => {
                self.state.empty_result_streak = 0;
                self.lower(self.config.success_nudge_ms);
            }
            ResponseStatus::Failed | ResponseStatus::TimedOut | ResponseStatus::RateLimited => {}
        }
    }

    fn record_rate_limit(&mut self, now: Instant) {
        let backoff = self.state.current_backoff_ms;
        self.state.cooldown_until = Some(now + Duration::from_millis(backoff));

        let grown = (self.state.dynamic_delay_ms as f64 * self.config.rate_limit_growth) as u64;
        self.state.dynamic_delay_ms =
            self.clamp(grown.saturating_add(self.config.rate_limit_increment_ms));

        let next_backoff = (backoff as f64 * self.config.backoff_growth) as u64;
        self.state.current_backoff_ms = next_backoff.min(self.config.max_backoff_ms());
        self.stats.rate_limited += 1;

        tracing::warn!(
            cooldown_ms = backoff,
            delay_ms = self.state.dynamic_delay_ms,
            next_backoff_ms = self.state.current_backoff_ms,
            "rate limited, entering cooldown"
        );
    }

    fn raise(&mut self, step_ms: u64) {
        self.state.dynamic_delay_ms =
            self.clamp(self.state.dynamic_delay_ms.saturating_add(step_ms));
    }

    fn lower(&mut self, step_ms: u64) {
        self.state.dynamic_delay_ms =
            self.clamp(self.state.dynamic_delay_ms.saturating_sub(step_ms));
    }

    fn clamp(&self, delay_ms: u64) -> u64 {
        delay_ms.clamp(self.config.min_delay_ms, self.config.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn feedback(status: ResponseStatus, response_ms: u64) -> ResponseFeedback {
        let result_count = usize::from(status == ResponseStatus::Ok);
        ResponseFeedback {
            status,
            result_count,
            response_time: Duration::from_millis(response_ms),
        }
    }

    /// A latency between the fast and slow thresholds of the default config.
    const NEUTRAL_MS: u64 = 2_000;

    #[test]
    fn starts_at_base_delay() {
        let controller = RateController::new(PacingConfig::default());
        assert_eq!(controller.state().dynamic_delay_ms, 3_000);
        assert_eq!(controller.state().current_backoff_ms, 10_000);
        assert!(controller.state().cooldown_until.is_none());
    }

    #[test]
    fn priority_ordering_of_base_delay() {
        let controller = RateController::new(PacingConfig::default());
        let high = controller.base_for_priority(Priority::High);
        let medium = controller.base_for_priority(Priority::Medium);
        let low = controller.base_for_priority(Priority::Low);
        assert!(high <= medium && medium <= low);
        assert_eq!((high, medium, low), (2_000, 3_000, 4_000));
    }

    #[test]
    fn priority_offset_respects_bounds() {
        let floor = RateController::new(PacingConfig {
            base_delay_ms: 2_000,
            min_delay_ms: 1_800,
            ..Default::default()
        });
        assert_eq!(floor.base_for_priority(Priority::High), 1_800);

        let cap = RateController::new(PacingConfig {
            base_delay_ms: 14_500,
            ..Default::default()
        });
        assert_eq!(cap.base_for_priority(Priority::Low), 15_000);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_sets_cooldown_and_grows_delay() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.after_response(&feedback(ResponseStatus::RateLimited, NEUTRAL_MS));

        let state = controller.state();
        assert_eq!(state.dynamic_delay_ms, 6_500); // 3000 * 1.5 + 2000
        assert_eq!(state.current_backoff_ms, 15_000);
        assert_eq!(controller.cooldown_remaining(), Some(Duration::from_millis(10_000)));
        assert_eq!(controller.stats().rate_limited, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rate_limits_are_capped() {
        let mut controller = RateController::new(PacingConfig::default());
        for _ in 0..20 {
            controller.after_response(&feedback(ResponseStatus::RateLimited, NEUTRAL_MS));
        }
        assert_eq!(controller.state().dynamic_delay_ms, 15_000);
        assert_eq!(controller.state().current_backoff_ms, 60_000);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_dominates_every_priority() {
        for priority in [Priority::High, Priority::Medium, Priority::Low] {
            let mut controller = RateController::new(PacingConfig::default());
            controller.after_response(&feedback(ResponseStatus::RateLimited, NEUTRAL_MS));
            let remaining = controller.cooldown_remaining().expect("cooldown active");

            let started = Instant::now();
            controller.before_request(priority).await;
            assert!(
                started.elapsed() >= remaining,
                "{priority} request released before cooldown elapsed"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_is_not_delayed() {
        let mut controller = RateController::new(PacingConfig::default());
        let waited = controller.before_request(Priority::Medium).await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_uses_max_of_dynamic_and_priority_base() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.before_request(Priority::Medium).await;

        let waited = controller.before_request(Priority::Low).await;
        assert_eq!(waited, Duration::from_millis(4_000));

        // High priority cannot undercut the dynamic delay.
        let waited = controller.before_request(Priority::High).await;
        assert_eq!(waited, Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_counts_time_already_elapsed() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.before_request(Priority::Medium).await;
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let waited = controller.before_request(Priority::Medium).await;
        assert_eq!(waited, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn dense_window_raises_delay() {
        let mut controller = RateController::new(PacingConfig {
            max_requests_per_minute: 3,
            ..Default::default()
        });
        for _ in 0..3 {
            controller.after_response(&feedback(ResponseStatus::Failed, NEUTRAL_MS));
        }
        assert_eq!(controller.state().dynamic_delay_ms, 3_000);

        controller.after_response(&feedback(ResponseStatus::Failed, NEUTRAL_MS));
        assert_eq!(controller.state().dynamic_delay_ms, 3_500);
    }

    #[tokio::test(start_paused = true)]
    async fn window_prunes_entries_older_than_a_minute() {
        let mut controller = RateController::new(PacingConfig::default());
        for _ in 0..5 {
            controller.after_response(&feedback(ResponseStatus::Failed, NEUTRAL_MS));
        }
        assert_eq!(controller.requests_in_window(), 5);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(controller.requests_in_window(), 0);

        controller.after_response(&feedback(ResponseStatus::Failed, NEUTRAL_MS));
        assert_eq!(controller.state().recent_requests.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_moves_delay_both_ways() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.after_response(&feedback(ResponseStatus::Failed, 5_000));
        assert_eq!(controller.state().dynamic_delay_ms, 3_500);

        controller.after_response(&feedback(ResponseStatus::Failed, 100));
        assert_eq!(controller.state().dynamic_delay_ms, 3_300);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_responses_floor_at_min_delay() {
        let mut controller = RateController::new(PacingConfig::default());
        for _ in 0..50 {
            controller.after_response(&feedback(ResponseStatus::Failed, 10));
            tokio::time::advance(Duration::from_secs(5)).await;
        }
        assert!(controller.state().recent_requests.len() < 20);
        assert_eq!(controller.state().dynamic_delay_ms, 1_500);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_streak_speeds_up_and_resets() {
        let mut controller = RateController::new(PacingConfig {
            empty_streak_threshold: 3,
            ..Default::default()
        });
        controller.after_response(&feedback(ResponseStatus::Empty, NEUTRAL_MS));
        controller.after_response(&feedback(ResponseStatus::Empty, NEUTRAL_MS));
        assert_eq!(controller.state().empty_result_streak, 2);
        assert_eq!(controller.state().dynamic_delay_ms, 3_000);

        controller.after_response(&feedback(ResponseStatus::Empty, NEUTRAL_MS));
        assert_eq!(controller.state().empty_result_streak, 0);
        assert_eq!(controller.state().dynamic_delay_ms, 2_700);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_streak_and_nudges_down() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.after_response(&feedback(ResponseStatus::Empty, NEUTRAL_MS));
        controller.after_response(&feedback(ResponseStatus::Ok, NEUTRAL_MS));
        assert_eq!(controller.state().empty_result_streak, 0);
        assert_eq!(controller.state().dynamic_delay_ms, 2_950);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_applies_before_empty_streak() {
        let mut controller = RateController::new(PacingConfig {
            empty_streak_threshold: 1,
            ..Default::default()
        });
        // Slow (+500) then empty streak (-300) in the same cycle.
        controller.after_response(&feedback(ResponseStatus::Empty, 6_000));
        assert_eq!(controller.state().dynamic_delay_ms, 3_200);

        // At the ceiling the raise saturates first, so the reduction still shows.
        let mut capped = RateController::new(PacingConfig {
            base_delay_ms: 15_000,
            empty_streak_threshold: 1,
            ..Default::default()
        });
        capped.after_response(&feedback(ResponseStatus::Empty, 6_000));
        assert_eq!(capped.state().dynamic_delay_ms, 14_700);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_skips_other_adjustments() {
        let mut controller = RateController::new(PacingConfig {
            empty_streak_threshold: 1,
            ..Default::default()
        });
        controller.after_response(&feedback(ResponseStatus::Empty, NEUTRAL_MS));
        let before = controller.state().dynamic_delay_ms;
        controller.after_response(&feedback(ResponseStatus::RateLimited, 10));
        let expected = ((before as f64 * 1.5) as u64 + 2_000).min(15_000);
        assert_eq!(controller.state().dynamic_delay_ms, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_stays_within_bounds_for_random_sequences() {
        let config = PacingConfig {
            max_requests_per_minute: 5,
            empty_streak_threshold: 2,
            ..Default::default()
        };
        let (min, max) = (config.min_delay_ms, config.max_delay_ms);
        let statuses = [
            ResponseStatus::Ok,
            ResponseStatus::Empty,
            ResponseStatus::RateLimited,
            ResponseStatus::Failed,
            ResponseStatus::TimedOut,
        ];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut controller = RateController::new(config.clone());
            for _ in 0..300 {
                let status = statuses[rng.gen_range(0..statuses.len())];
                let latency = rng.gen_range(0..12_000);
                controller.after_response(&feedback(status, latency));
                let delay = controller.state().dynamic_delay_ms;
                assert!((min..=max).contains(&delay), "delay {delay} out of bounds");
                assert!(controller.state().current_backoff_ms <= config.max_backoff_ms());
                tokio::time::advance(Duration::from_millis(rng.gen_range(0..5_000))).await;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stats_track_requests_and_waits() {
        let mut controller = RateController::new(PacingConfig::default());
        controller.before_request(Priority::Medium).await;
        controller.before_request(Priority::Medium).await;
        let stats = controller.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.total_wait, Duration::from_millis(3_000));
    }
}
