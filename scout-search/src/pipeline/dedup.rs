//! The accepted-record set, keyed by case-folded identity.
//!
//! Insertion is the single source of truth for uniqueness. The final
//! re-scan in [`AcceptedSet::verify_unique`] is a sanity check only.

use std::collections::{HashMap, HashSet};

use crate::types::AcceptedRecord;

/// Dedup key for an identity: the case-folded handle.
pub fn dedup_key(identity: &str) -> String {
    identity.to_lowercase()
}

/// Accepted records in acceptance order, with a key index.
#[derive(Debug, Default)]
pub struct AcceptedSet {
    records: Vec<AcceptedRecord>,
    keys: HashSet<String>,
}

impl AcceptedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a record for this identity has been accepted.
    pub fn contains(&self, identity: &str) -> bool {
        self.keys.contains(&dedup_key(identity))
    }

    /// Insert a record. Returns `false`, leaving the set untouched, if the
    /// identity is already present.
    pub fn insert(&mut self, record: AcceptedRecord) -> bool {
        if !self.keys.insert(dedup_key(&record.profile.identity)) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Number of accepted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Accepted records in acceptance order.
    pub fn records(&self) -> &[AcceptedRecord] {
        &self.records
    }

    /// Consume the set, returning its records.
    pub fn into_records(self) -> Vec<AcceptedRecord> {
        self.records
    }

    /// Identity keys that occur more than once among the records.
    ///
    /// Always empty unless the insertion invariant was broken.
    pub fn collisions(&self) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(dedup_key(&record.profile.identity)).or_default() += 1;
        }
        let mut dupes: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect();
        dupes.sort();
        dupes
    }

    /// Re-scan the records for key collisions.
    pub fn verify_unique(&self) -> bool {
        self.collisions().is_empty() && self.keys.len() == self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Profile;

    fn record(identity: &str) -> AcceptedRecord {
        AcceptedRecord::new(
            Profile {
                identity: identity.into(),
                ..Default::default()
            },
            "test",
        )
    }

    #[test]
    fn key_is_case_folded() {
        assert_eq!(dedup_key("Coach.Ahmed"), "coach.ahmed");
    }

    #[test]
    fn insert_rejects_case_variants() {
        let mut set = AcceptedSet::new();
        assert!(set.insert(record("coach.ahmed")));
        assert!(!set.insert(record("Coach.Ahmed")));
        assert_eq!(set.len(), 1);
        assert!(set.contains("COACH.AHMED"));
    }

    #[test]
    fn duplicate_insert_keeps_first_record() {
        let mut set = AcceptedSet::new();
        let mut first = record("sara.fit");
        first.origin_label = "sara + coach".into();
        let mut second = record("sara.fit");
        second.origin_label = "fitness coach".into();

        set.insert(first);
        set.insert(second);
        assert_eq!(set.records()[0].origin_label, "sara + coach");
    }

    #[test]
    fn reinsertion_is_idempotent() {
        let identities = ["a", "B", "c", "b", "A", "d"];
        let mut set = AcceptedSet::new();
        for id in identities {
            set.insert(record(id));
        }
        let once = set.len();
        for id in identities {
            assert!(!set.insert(record(id)));
        }
        assert_eq!(set.len(), once);
        assert_eq!(once, 4);
        assert!(set.verify_unique());
    }

    #[test]
    fn preserves_acceptance_order() {
        let mut set = AcceptedSet::new();
        for id in ["z", "a", "m"] {
            set.insert(record(id));
        }
        let order: Vec<String> = set
            .into_records()
            .into_iter()
            .map(|r| r.profile.identity)
            .collect();
        assert_eq!(order, vec!["z", "a", "m"]);
    }

    #[test]
    fn empty_set_is_unique() {
        let set = AcceptedSet::new();
        assert!(set.is_empty());
        assert!(set.verify_unique());
        assert!(set.collisions().is_empty());
    }
}
