//! Collaborator traits for the remote search and profile endpoints.
//!
//! The scheduler never talks to the network directly. It drives a
//! [`SearchClient`] and a [`ProfileClient`], measures each call itself,
//! and feeds the outcome to the rate controller. Implementations own the
//! wire format, credentials, and response decoding.

use std::future::Future;
use std::sync::Arc;

use crate::error::SearchError;
use crate::types::{Priority, Profile, RawHit};

/// Text search over the remote service.
///
/// Implementations must report throttling as [`SearchError::RateLimited`],
/// distinct from any other failure. All implementations must be
/// `Send + Sync`.
pub trait SearchClient: Send + Sync {
    /// Search for `term`, returning hits in the service's own order.
    ///
    /// # Errors
    ///
    /// [`SearchError::RateLimited`] when throttled, otherwise any
    /// [`SearchError`] describing the transport or decode failure.
    fn search(
        &self,
        term: &str,
        priority: Priority,
    ) -> impl Future<Output = Result<Vec<RawHit>, SearchError>> + Send;
}

/// Full profile detail lookup.
pub trait ProfileClient: Send + Sync {
    /// Fetch the profile for `identity`. `Ok(None)` means the service had
    /// no data for it.
    ///
    /// # Errors
    ///
    /// Same contract as [`SearchClient::search`].
    fn fetch(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<Option<Profile>, SearchError>> + Send;
}

impl<T: SearchClient> SearchClient for Arc<T> {
    fn search(
        &self,
        term: &str,
        priority: Priority,
    ) -> impl Future<Output = Result<Vec<RawHit>, SearchError>> + Send {
        (**self).search(term, priority)
    }
}

impl<T: ProfileClient> ProfileClient for Arc<T> {
    fn fetch(
        &self,
        identity: &str,
    ) -> impl Future<Output = Result<Option<Profile>, SearchError>> + Send {
        (**self).fetch(identity)
    }
}
