//! Progress events emitted during a run.
//!
//! Callback-based reporting keeps the control loop independent of how
//! progress is presented (CLI progress bars, logs, tests).

use std::time::Duration;

use crate::types::Priority;

/// Progress events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A phase is about to issue its first term.
    PhaseStarted {
        /// Phase name.
        name: String,
        /// Phase priority.
        priority: Priority,
        /// Number of terms in the phase.
        terms: usize,
    },
    /// A term's search and all resulting profile fetches are done. Sent
    /// for every issued term, including throttled and failed searches.
    TermFinished {
        /// Provenance label of the term.
        origin_label: String,
        /// Hits returned by the search.
        hits: usize,
        /// Records accepted so far in the whole run.
        accepted_total: usize,
    },
    /// A profile was accepted.
    ProfileAccepted {
        /// Identity of the accepted profile.
        identity: String,
        /// Provenance label of the term that found it.
        origin_label: String,
    },
    /// The next request is blocked by a rate-limit cooldown.
    Cooldown {
        /// Time left on the cooldown.
        remaining: Duration,
    },
    /// The inter-phase pause has started.
    Pausing {
        /// Length of the pause.
        duration: Duration,
    },
    /// A phase has finished.
    PhaseFinished {
        /// Phase name.
        name: String,
        /// Records accepted during this phase.
        accepted: usize,
    },
}

/// Callback type for receiving progress events.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callback_receives_events() {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);

        let callback: ProgressCallback = Box::new(move |event| {
            let Ok(mut guard) = events_clone.lock() else {
                return;
            };
            guard.push(event);
        });

        callback(ProgressEvent::PhaseStarted {
            name: "priority".into(),
            priority: Priority::High,
            terms: 2,
        });
        callback(ProgressEvent::Cooldown {
            remaining: Duration::from_secs(10),
        });

        let guard = events.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(guard.len(), 2);
        assert!(matches!(&guard[0], ProgressEvent::PhaseStarted { terms: 2, .. }));
        assert!(matches!(
            &guard[1],
            ProgressEvent::Cooldown { remaining } if *remaining == Duration::from_secs(10)
        ));
    }
}
