//! Status probe - one observational call against the remote API

use crate::classify::ErrorClassifier;
use crate::error::{RemoteError, Result};
use crate::types::{Observation, ResourceHandle};

/// Remote read API for a single resource kind.
///
/// Implemented by the transport layer. A not-found condition is returned as
/// a `RemoteError`; [`StatusProbe`] turns it into [`Status::Absent`].
///
/// [`Status::Absent`]: crate::types::Status::Absent
pub trait RemoteStatusApi {
    /// Fetch current status for `handle`.
    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError>;
}

impl<F> RemoteStatusApi for F
where
    F: Fn(&ResourceHandle) -> std::result::Result<Observation, RemoteError>,
{
    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self(handle)
    }
}

/// Fetches status, separating "not found" from real failures.
pub struct StatusProbe<'a> {
    api: &'a dyn RemoteStatusApi,
    classifier: &'a dyn ErrorClassifier,
}

impl<'a> StatusProbe<'a> {
    pub fn new(api: &'a dyn RemoteStatusApi, classifier: &'a dyn ErrorClassifier) -> Self {
        Self { api, classifier }
    }

    /// Observe the resource once.
    ///
    /// Not-found comes back as an absent observation, not an error. Any
    /// other remote error is returned untranslated.
    pub fn probe(&self, handle: &ResourceHandle) -> Result<Observation> {
        match self.api.describe(handle) {
            Ok(observation) => {
                log::debug!("probe {handle}: {}", observation.status);
                Ok(observation)
            }
            Err(e) if self.classifier.is_absent(&e) => {
                log::debug!("probe {handle}: absent ({e})");
                Ok(Observation::absent())
            }
            Err(e) => Err(e.into()),
        }
    }
}
