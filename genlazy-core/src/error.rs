use thiserror::Error;

/// Errors raised by the cache machinery itself.
///
/// Failures of a user-supplied factory are not represented here: a fallible
/// factory picks its own error type `E`, which only has to implement
/// `From<CacheError>` so that these errors can travel through the same
/// `Result` returned by [`Cache::value`](crate::Cache::value).
///
/// # Examples
///
/// ```
/// use genlazy_core::{CacheError, Expiry, ExpiringCache};
/// use std::time::Duration;
///
/// let err = ExpiringCache::new(Expiry::After(Duration::ZERO), || 1).unwrap_err();
/// assert!(matches!(err, CacheError::InvalidConfiguration { .. }));
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The cache was constructed with settings it cannot honour,
    /// such as a zero expiry window.
    #[error("invalid cache configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// A thread tried to re-acquire a cache lock it already holds,
    /// for example by calling back into the cache from a validity hook.
    #[error("reentrant access to cache state is prohibited")]
    Reentrancy,
}

impl CacheError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CacheError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
