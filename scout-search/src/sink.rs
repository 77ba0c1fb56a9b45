//! Result sinks: where accepted records go at the end of a run or phase.

use std::sync::{Arc, Mutex};

use crate::error::SearchError;
use crate::types::AcceptedRecord;

/// Persists accepted records.
///
/// Called once per run, or once per phase for checkpointed runs, always
/// with the full accepted set so far.
pub trait ResultSink: Send + Sync {
    /// Persist `records`, returning opaque location descriptors such as
    /// file paths.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Export`] if the records cannot be written.
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError>;
}

impl<T: ResultSink> ResultSink for Arc<T> {
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError> {
        (**self).export(records)
    }
}

/// Keeps every exported snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    snapshots: Mutex<Vec<Vec<AcceptedRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots exported so far, oldest first.
    pub fn snapshots(&self) -> Vec<Vec<AcceptedRecord>> {
        self.snapshots
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ResultSink for MemorySink {
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|_| SearchError::Export("memory sink lock poisoned".into()))?;
        guard.push(records.to_vec());
        Ok(vec![format!("memory:{}", guard.len() - 1)])
    }
}
