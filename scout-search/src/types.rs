//! Core types shared by the scheduler: terms, phases, hits, profiles, records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Priority tier of an outbound request.
///
/// Ordering follows urgency: `High` requests get the shortest base spacing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Most valuable requests; base delay reduced by the priority offset.
    High,
    /// Base delay unmodified.
    #[default]
    Medium,
    /// Least valuable requests; base delay increased by the priority offset.
    Low,
}

impl Priority {
    /// Returns the lowercase label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single search string with its priority and provenance.
///
/// Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// The query text sent to the search collaborator.
    pub text: String,
    /// Priority used when gating the search request.
    pub priority: Priority,
    /// Index of the phase this term belongs to.
    pub phase_id: usize,
    /// Human-readable provenance, e.g. `"ahmed + trainer"`.
    pub origin_label: String,
}

/// An ordered batch of terms sharing a generation strategy and priority tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Position of the phase in the run.
    pub id: usize,
    /// Phase name, e.g. `"priority"`.
    pub name: String,
    /// Priority shared by every term of this phase.
    pub priority: Priority,
    /// Terms in issue order.
    pub terms: Vec<Term>,
    /// Number of terms the phase was generated with.
    pub expected_count: usize,
}

impl Phase {
    /// Returns `true` if the phase has no terms to issue.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// A cheap, possibly stale search-result summary.
///
/// Used only to decide whether full profile detail is worth fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHit {
    /// Account handle as returned by search.
    pub identity: String,
    /// Display name, if the search result carried one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Follower count hint.
    #[serde(default)]
    pub follower_count_hint: Option<u64>,
    /// Privacy hint.
    #[serde(default)]
    pub is_private_hint: Option<bool>,
    /// Biography excerpt hint.
    #[serde(default)]
    pub bio_hint: Option<String>,
}

impl RawHit {
    /// Create a hit carrying only an identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }
}

/// The authoritative detail record for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account handle.
    pub identity: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Biography text.
    #[serde(default)]
    pub biography: String,
    /// Follower count.
    #[serde(default)]
    pub follower_count: u64,
    /// Following count.
    #[serde(default)]
    pub following_count: u64,
    /// Number of posts.
    #[serde(default)]
    pub post_count: u64,
    /// Verified badge.
    #[serde(default)]
    pub is_verified: bool,
    /// Business account flag.
    #[serde(default)]
    pub is_business: bool,
    /// Private account flag.
    #[serde(default)]
    pub is_private: bool,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Result of running the profile filter. Failure reasons are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterVerdict {
    /// Whether the profile passed every check.
    pub pass: bool,
    /// Why the profile passed or failed.
    pub reason: String,
}

impl FilterVerdict {
    /// A passing verdict.
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            pass: true,
            reason: reason.into(),
        }
    }

    /// A failing verdict.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            pass: false,
            reason: reason.into(),
        }
    }
}

/// A profile accepted into the output set. Never mutated after acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRecord {
    /// The full profile detail.
    #[serde(flatten)]
    pub profile: Profile,
    /// Provenance of the term that discovered this profile.
    pub origin_label: String,
    /// When the record was accepted.
    pub accepted_at: DateTime<Utc>,
}

impl AcceptedRecord {
    /// Build a record stamped with the current time.
    pub fn new(profile: Profile, origin_label: impl Into<String>) -> Self {
        Self {
            profile,
            origin_label: origin_label.into(),
            accepted_at: Utc::now(),
        }
    }
}

/// Outcome class of one outbound call, as seen by the pacing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// Success with at least one result.
    Ok,
    /// Success with zero results.
    Empty,
    /// The service signalled throttling.
    RateLimited,
    /// Transport or decode failure.
    Failed,
    /// The per-call timeout elapsed.
    TimedOut,
}

impl ResponseStatus {
    /// Returns `true` for a successful call, empty or not.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Empty)
    }

    /// Returns `true` for failures other than throttling.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

/// Feedback recorded into the rate controller after every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFeedback {
    /// Outcome class.
    pub status: ResponseStatus,
    /// Number of results (hits, or 1/0 for a profile fetch).
    pub result_count: usize,
    /// Wall-clock time the call took.
    pub response_time: Duration,
}

impl ResponseFeedback {
    /// Build feedback for a successful call, classifying empty results.
    pub fn success(result_count: usize, response_time: Duration) -> Self {
        let status = if result_count == 0 {
            ResponseStatus::Empty
        } else {
            ResponseStatus::Ok
        };
        Self {
            status,
            result_count,
            response_time,
        }
    }

    /// Build feedback for a call that produced no usable results.
    pub fn with_status(status: ResponseStatus, response_time: Duration) -> Self {
        Self {
            status,
            result_count: 0,
            response_time,
        }
    }
}
