//! Dedup and filter pipeline.
//!
//! [`DedupFilterPipeline`] owns the accepted-record set and the compiled
//! filter for one run. It is an explicit state object handed to the
//! orchestrator, so independent runs never share state.

pub mod dedup;
pub mod filter;

pub use dedup::{dedup_key, AcceptedSet};
pub use filter::{filter, ProfileFilter};

use crate::config::FilterConfig;
use crate::types::{AcceptedRecord, FilterVerdict, Profile};

/// What happened to a profile offered to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The profile passed the filter and was inserted.
    Accepted,
    /// The identity was already accepted; nothing changed.
    Duplicate,
    /// The filter rejected the profile.
    Rejected(FilterVerdict),
}

/// Stateful dedup set plus a pure filter.
#[derive(Debug)]
pub struct DedupFilterPipeline {
    filter: ProfileFilter,
    accepted: AcceptedSet,
}

impl DedupFilterPipeline {
    /// Create an empty pipeline with the given filter rules.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            filter: ProfileFilter::new(config),
            accepted: AcceptedSet::new(),
        }
    }

    /// Returns `true` if this identity has already been accepted.
    pub fn is_known(&self, identity: &str) -> bool {
        self.accepted.contains(identity)
    }

    /// Run the filter without touching the accepted set.
    pub fn evaluate(&self, profile: &Profile) -> FilterVerdict {
        self.filter.evaluate(profile)
    }

    /// Filter a profile and, if it passes, accept it with the given origin.
    pub fn admit(&mut self, profile: Profile, origin_label: &str) -> Admission {
        if self.is_known(&profile.identity) {
            return Admission::Duplicate;
        }
        let verdict = self.filter.evaluate(&profile);
        if !verdict.pass {
            return Admission::Rejected(verdict);
        }
        if self.accepted.insert(AcceptedRecord::new(profile, origin_label)) {
            Admission::Accepted
        } else {
            Admission::Duplicate
        }
    }

    /// The accepted set.
    pub fn accepted(&self) -> &AcceptedSet {
        &self.accepted
    }

    /// Accepted records in acceptance order.
    pub fn records(&self) -> &[AcceptedRecord] {
        self.accepted.records()
    }

    /// Consume the pipeline, returning its records.
    pub fn into_records(self) -> Vec<AcceptedRecord> {
        self.accepted.into_records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordSets;

    fn pipeline() -> DedupFilterPipeline {
        let mut include = KeywordSets::new();
        include.insert("english".into(), vec!["coach".into()]);
        DedupFilterPipeline::new(&FilterConfig {
            include,
            ..Default::default()
        })
    }

    fn profile(identity: &str, bio: &str) -> Profile {
        Profile {
            identity: identity.into(),
            biography: bio.into(),
            ..Default::default()
        }
    }

    #[test]
    fn admits_passing_profiles_once() {
        let mut pipeline = pipeline();
        assert_eq!(
            pipeline.admit(profile("sara.fit", "online coach"), "sara + coach"),
            Admission::Accepted
        );
        assert_eq!(
            pipeline.admit(profile("SARA.FIT", "online coach"), "coach"),
            Admission::Duplicate
        );
        assert_eq!(pipeline.records().len(), 1);
        assert_eq!(pipeline.records()[0].origin_label, "sara + coach");
        assert!(pipeline.is_known("Sara.Fit"));
    }

    #[test]
    fn rejected_profiles_are_not_remembered() {
        let mut pipeline = pipeline();
        let admission = pipeline.admit(profile("omar", "photographer"), "omar + coach");
        assert!(matches!(admission, Admission::Rejected(ref v) if !v.pass));
        assert!(!pipeline.is_known("omar"));

        // A later, updated profile for the same identity can still pass.
        assert_eq!(
            pipeline.admit(profile("omar", "photographer and coach"), "coach"),
            Admission::Accepted
        );
    }

    #[test]
    fn rediscovery_leaves_set_size_unchanged() {
        let batch = vec![
            profile("a", "coach"),
            profile("b", "coach"),
            profile("c", "chef"),
            profile("A", "coach"),
        ];
        let mut pipeline = pipeline();
        for p in batch.clone() {
            pipeline.admit(p, "first");
        }
        let once = pipeline.records().len();
        for p in batch {
            pipeline.admit(p, "second");
        }
        assert_eq!(pipeline.records().len(), once);
        assert_eq!(once, 2);
        assert!(pipeline.accepted().verify_unique());
    }
}
