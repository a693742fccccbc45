use crate::{Cache, CacheCore, CacheError, CacheStrategy};
#[cfg(feature = "stats")]
use crate::CacheStats;
use std::fmt;

pub(crate) type Factory<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Strategy behind [`LazyCache`]: a value stays valid until invalidated.
pub(crate) struct LazyStrategy<T, E> {
    factory: Factory<T, E>,
}

impl<T: Clone, E: From<CacheError>> CacheStrategy for LazyStrategy<T, E> {
    type Value = T;
    type Error = E;
    type Meta = ();

    fn create_value(&self) -> Result<T, E> {
        (self.factory)()
    }
}

/// A lazily computed value that stays cached until [`invalidate`](Cache::invalidate)
/// is called.
///
/// The factory runs at most once per generation, outside every lock, and
/// concurrent callers wait for that single computation instead of starting
/// their own.
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, LazyCache};
///
/// let cache = LazyCache::new(|| "config".to_string());
/// assert_eq!(cache.value().unwrap(), "config");
/// ```
///
/// Fallible factories keep their own error type:
///
/// ```
/// use genlazy_core::{Cache, CacheError, LazyCache};
///
/// #[derive(Debug)]
/// enum LoadError {
///     Missing,
///     Cache(CacheError),
/// }
///
/// impl From<CacheError> for LoadError {
///     fn from(e: CacheError) -> Self {
///         LoadError::Cache(e)
///     }
/// }
///
/// let cache: LazyCache<u32, LoadError> = LazyCache::try_new(|| Err(LoadError::Missing));
/// assert!(matches!(cache.value(), Err(LoadError::Missing)));
/// assert!(!cache.is_valid().unwrap());
/// ```
pub struct LazyCache<T: Clone, E: From<CacheError> = CacheError> {
    core: CacheCore<LazyStrategy<T, E>>,
}

impl<T: Clone> LazyCache<T> {
    /// Creates a cache around an infallible factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(factory()))
    }
}

impl<T: Clone, E: From<CacheError>> LazyCache<T, E> {
    /// Creates a cache around a fallible factory. Errors are returned from
    /// [`value`](Cache::value) as-is and are never cached.
    pub fn try_new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            core: CacheCore::new(LazyStrategy {
                factory: Box::new(factory),
            }),
        }
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.core.stats()
    }
}

impl<T: Clone, E: From<CacheError>> Cache<T> for LazyCache<T, E> {
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

impl<T: Clone, E: From<CacheError>> fmt::Debug for LazyCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCache").finish_non_exhaustive()
    }
}
