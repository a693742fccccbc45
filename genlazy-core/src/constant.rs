use crate::lazy::Factory;
use crate::{Cache, CacheError};
use std::fmt;

/// A cache that always holds the same value.
///
/// `is_valid()` is always `true` and `invalidate()` is an accepted no-op, so
/// a constant can stand anywhere another cache is expected, for instance
/// behind an [`ExpiringCache::wrap`](crate::ExpiringCache::wrap).
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, ConstantCache};
///
/// let cache = ConstantCache::new(5);
/// cache.invalidate().unwrap();
/// assert_eq!(cache.value().unwrap(), 5);
/// assert!(cache.is_valid().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ConstantCache<T> {
    value: T,
}

impl<T: Clone> ConstantCache<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone> Cache<T> for ConstantCache<T> {
    type Error = CacheError;

    fn value(&self) -> Result<T, CacheError> {
        Ok(self.value.clone())
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        Ok(true)
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        Ok(Some(self.value.clone()))
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// A "cache" that never caches: every `value()` runs the factory.
///
/// `is_valid()` is always `false`, `try_get_value()` always `None`, and
/// `invalidate()` is an accepted no-op.
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, UncachedCache};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let calls = AtomicUsize::new(0);
/// let cache = UncachedCache::new(move || calls.fetch_add(1, Ordering::SeqCst));
/// assert_eq!(cache.value().unwrap(), 0);
/// assert_eq!(cache.value().unwrap(), 1);
/// assert!(!cache.is_valid().unwrap());
/// ```
pub struct UncachedCache<T, E = CacheError> {
    factory: Factory<T, E>,
}

impl<T> UncachedCache<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(factory()))
    }
}

impl<T, E: From<CacheError>> UncachedCache<T, E> {
    pub fn try_new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }
}

impl<T, E: From<CacheError>> Cache<T> for UncachedCache<T, E> {
    type Error = E;

    fn value(&self) -> Result<T, E> {
        (self.factory)()
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        Ok(None)
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

impl<T, E> fmt::Debug for UncachedCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncachedCache").finish_non_exhaustive()
    }
}
