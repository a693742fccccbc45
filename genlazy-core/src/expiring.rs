use crate::lazy::Factory;
use crate::{Cache, CacheCore, CacheError, CacheStrategy};
#[cfg(feature = "stats")]
use crate::CacheStats;
use std::fmt;
use std::time::{Duration, Instant};

/// How long a stored value stays valid.
///
/// # Examples
///
/// ```
/// use genlazy_core::Expiry;
/// use std::time::{Duration, Instant};
///
/// let stored_at = Instant::now();
/// assert!(!Expiry::After(Duration::from_secs(60)).is_expired(stored_at));
/// assert!(!Expiry::Never.is_expired(stored_at));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The value expires once this much time has passed since it was stored.
    /// Must be strictly positive.
    After(Duration),
    /// The value only goes away through explicit invalidation.
    Never,
}

impl Expiry {
    /// Returns `true` if a value stored at `stored_at` is past its window.
    ///
    /// A value is valid while `elapsed < after`, so it is expired exactly
    /// when the elapsed time reaches the window.
    pub fn is_expired(&self, stored_at: Instant) -> bool {
        match self {
            Expiry::After(after) => stored_at.elapsed() >= *after,
            Expiry::Never => false,
        }
    }

    pub(crate) fn validate(self) -> Result<Self, CacheError> {
        match self {
            Expiry::After(after) if after.is_zero() => Err(CacheError::invalid(
                "expiry window must be strictly positive, use Expiry::Never for no expiry",
            )),
            expiry => Ok(expiry),
        }
    }
}

impl From<Duration> for Expiry {
    fn from(after: Duration) -> Self {
        Expiry::After(after)
    }
}

pub(crate) struct ExpiringStrategy<T, E> {
    factory: Factory<T, E>,
    expiry: Expiry,
}

impl<T: Clone, E: From<CacheError>> CacheStrategy for ExpiringStrategy<T, E> {
    type Value = T;
    type Error = E;
    /// Monotonic time at which the current value was stored.
    type Meta = Option<Instant>;

    fn create_value(&self) -> Result<T, E> {
        (self.factory)()
    }

    fn is_current_value_valid(&self, _value: &T, stored_at: &Option<Instant>) -> bool {
        match stored_at {
            Some(at) => !self.expiry.is_expired(*at),
            None => false,
        }
    }

    fn store_value(&self, _value: &T, stored_at: &mut Option<Instant>) {
        *stored_at = Some(Instant::now());
    }

    fn on_invalidate(&self, stored_at: &mut Option<Instant>) {
        *stored_at = None;
    }
}

/// A lazy cache whose value also expires after a fixed window.
///
/// The window starts when a value is published, measured with the monotonic
/// [`Instant`] clock. Expiry and invalidation both make the next `value()`
/// compute again.
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, Expiry, ExpiringCache};
/// use std::time::Duration;
///
/// let cache = ExpiringCache::new(Expiry::After(Duration::from_secs(30)), || 7).unwrap();
/// assert_eq!(cache.value().unwrap(), 7);
/// assert!(cache.is_valid().unwrap());
/// ```
pub struct ExpiringCache<T: Clone, E: From<CacheError> = CacheError> {
    core: CacheCore<ExpiringStrategy<T, E>>,
}

impl<T: Clone> ExpiringCache<T> {
    /// Creates an expiring cache around an infallible factory.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfiguration`] if `expiry` is a zero duration.
    pub fn new<F>(expiry: impl Into<Expiry>, factory: F) -> Result<Self, CacheError>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(expiry, move || Ok(factory()))
    }
}

impl<T: Clone, E: From<CacheError>> ExpiringCache<T, E> {
    /// Creates an expiring cache around a fallible factory.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfiguration`] if `expiry` is a zero duration.
    pub fn try_new<F>(expiry: impl Into<Expiry>, factory: F) -> Result<Self, CacheError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let expiry = expiry.into().validate()?;
        Ok(Self {
            core: CacheCore::new(ExpiringStrategy {
                factory: Box::new(factory),
                expiry,
            }),
        })
    }

    /// Puts an expiry window in front of another cache.
    ///
    /// Each recomputation invalidates `inner` first and then reads it, so an
    /// expired wrapper always pulls a fresh inner value. Constant and
    /// uncached inner caches accept the invalidation as a no-op.
    ///
    /// ```
    /// use genlazy_core::{Cache, ConstantCache, ExpiringCache};
    /// use std::time::Duration;
    ///
    /// let cache = ExpiringCache::wrap(Duration::from_secs(5), ConstantCache::new("v1")).unwrap();
    /// assert_eq!(cache.value().unwrap(), "v1");
    /// ```
    pub fn wrap<C>(expiry: impl Into<Expiry>, inner: C) -> Result<Self, CacheError>
    where
        C: Cache<T, Error = E> + Send + Sync + 'static,
    {
        Self::try_new(expiry, move || {
            inner.invalidate()?;
            inner.value()
        })
    }

    /// Returns the configured expiry window.
    pub fn expiry(&self) -> Expiry {
        self.core.strategy().expiry
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.core.stats()
    }
}

impl<T: Clone, E: From<CacheError>> Cache<T> for ExpiringCache<T, E> {
    type Error = E;

    fn value(&self) -> Result<T, E> {
        self.core.value()
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        self.core.is_valid()
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        self.core.try_get_value()
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        self.core.invalidate()
    }
}

impl<T: Clone, E: From<CacheError>> fmt::Debug for ExpiringCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("expiry", &self.expiry())
            .finish_non_exhaustive()
    }
}
