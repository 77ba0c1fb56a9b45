//! Adaptive request pacing.
//!
//! Every outbound call passes through a single [`RateController`]: first
//! [`RateController::before_request`], which suspends the caller until it is
//! safe to send, then [`RateController::after_response`], which folds the
//! outcome back into the delay model.
//!
//! # Delay model
//!
//! ```text
//!               429                          slow / dense window
//!   ┌──────────────────────────┐          ┌───────────────────────┐
//!   │ cooldown = backoff       │          │ delay += step         │
//!   │ delay = delay*g + inc    │          └───────────────────────┘
//!   │ backoff = backoff*g      │          fast / empty streak / success
//!   └──────────────────────────┘          ┌───────────────────────┐
//!                                         │ delay -= step         │
//!                                         └───────────────────────┘
//!   delay is always clamped to [min_delay_ms, max_delay_ms]
//! ```
//!
//! The controller is owned by exactly one control loop. A fan-out redesign
//! must keep one controller as the single pacing authority, e.g. behind a
//! `tokio::sync::Mutex`, rather than one per worker.

pub mod controller;

pub use controller::{PacingStats, RateController, RateState, WINDOW};
