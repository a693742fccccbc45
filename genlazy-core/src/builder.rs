use crate::lazy::Factory;
use crate::{Cache, CacheError, ConstantCache, Expiry, ExpiringCache, LazyCache, UncachedCache};
use std::fmt;
use std::time::Duration;

/// A type-erased cache as produced by [`CacheBuilder::build`].
pub type BoxedCache<T, E = CacheError> = Box<dyn Cache<T, Error = E> + Send + Sync>;

/// Builds one of the factory-backed caches from construction-time options.
///
/// | Options                      | Result            |
/// |------------------------------|-------------------|
/// | none                         | [`LazyCache`]     |
/// | `expire_after` / `never_expire` | [`ExpiringCache`] |
/// | `uncached`                   | [`UncachedCache`] |
///
/// Constants skip the builder entirely through [`CacheBuilder::constant`].
/// Keyed caches take a key selector and are constructed directly with
/// [`KeyedVolatileCache::new`](crate::KeyedVolatileCache::new).
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, CacheBuilder};
/// use std::time::Duration;
///
/// let cache = CacheBuilder::new(|| vec![1, 2, 3])
///     .expire_after(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(cache.value().unwrap(), vec![1, 2, 3]);
///
/// // Conflicting options are rejected, never silently resolved.
/// assert!(CacheBuilder::new(|| 1)
///     .uncached()
///     .expire_after(Duration::from_secs(1))
///     .build()
///     .is_err());
/// ```
pub struct CacheBuilder<T, E = CacheError> {
    factory: Factory<T, E>,
    expiry: Option<Expiry>,
    uncached: bool,
}

impl<T: Clone + Send + Sync + 'static> CacheBuilder<T> {
    /// Starts a builder around an infallible factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::fallible(move || Ok(factory()))
    }

    /// Returns a cache that always yields `value`.
    pub fn constant(value: T) -> BoxedCache<T> {
        Box::new(ConstantCache::new(value))
    }
}

impl<T, E> CacheBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: From<CacheError> + 'static,
{
    /// Starts a builder around a fallible factory.
    pub fn fallible<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            expiry: None,
            uncached: false,
        }
    }

    /// Expires the cached value `after` it was stored.
    pub fn expire_after(mut self, after: Duration) -> Self {
        self.expiry = Some(Expiry::After(after));
        self
    }

    /// Builds an [`ExpiringCache`] whose value only goes away on invalidation.
    pub fn never_expire(mut self) -> Self {
        self.expiry = Some(Expiry::Never);
        self
    }

    /// Runs the factory on every access instead of caching.
    pub fn uncached(mut self) -> Self {
        self.uncached = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), CacheError> {
        if self.uncached && self.expiry.is_some() {
            return Err(CacheError::invalid(
                "an uncached cache cannot also have an expiry",
            ));
        }
        if let Some(expiry) = self.expiry {
            expiry.validate()?;
        }
        Ok(())
    }

    /// Builds the configured cache.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfiguration`] for a zero expiry window or for
    /// combining `uncached` with an expiry.
    pub fn build(self) -> Result<BoxedCache<T, E>, CacheError> {
        self.validate()?;
        let factory = self.factory;
        let cache: BoxedCache<T, E> = match (self.uncached, self.expiry) {
            (true, _) => Box::new(UncachedCache::try_new(factory)),
            (false, Some(expiry)) => Box::new(ExpiringCache::try_new(expiry, factory)?),
            (false, None) => Box::new(LazyCache::try_new(factory)),
        };
        Ok(cache)
    }
}

impl<T, E> fmt::Debug for CacheBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("expiry", &self.expiry)
            .field("uncached", &self.uncached)
            .finish_non_exhaustive()
    }
}
