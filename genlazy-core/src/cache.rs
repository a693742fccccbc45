use crate::guard::GenerationGuard;
use crate::CacheError;
#[cfg(feature = "stats")]
use crate::CacheStats;
use std::fmt;
use std::sync::Arc;

/// The contract shared by every cache in this crate.
///
/// # Guarantees
///
/// - [`value`](Cache::value) never returns a value whose generation has been
///   invalidated: once `invalidate()` returns, the next `value()` either
///   computes afresh or waits for a computation that started after the
///   invalidation.
/// - [`is_valid`](Cache::is_valid) and [`try_get_value`](Cache::try_get_value)
///   never run the factory and never wait for a running computation.
/// - [`invalidate`](Cache::invalidate) never waits for a running computation.
///
/// # Errors
///
/// `value()` returns the factory's own error type unchanged. Every method
/// can fail with [`CacheError::Reentrancy`] when called on a cache whose
/// lock the current thread already holds (for example from inside a
/// validity hook).
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, LazyCache};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let cache = LazyCache::new(move || counter.fetch_add(1, Ordering::SeqCst));
///
/// assert_eq!(cache.value().unwrap(), 0);
/// assert_eq!(cache.value().unwrap(), 0);
/// assert!(cache.is_valid().unwrap());
///
/// cache.invalidate().unwrap();
/// assert!(!cache.is_valid().unwrap());
/// assert_eq!(cache.try_get_value().unwrap(), None);
/// assert_eq!(cache.value().unwrap(), 1);
/// ```
pub trait Cache<T> {
    /// Error returned by [`value`](Cache::value).
    type Error: From<CacheError>;

    /// Returns the cached value, computing it first if necessary.
    ///
    /// May block while another thread computes the value.
    fn value(&self) -> Result<T, Self::Error>;

    /// Returns `true` if `value()` would currently be served without
    /// computing.
    fn is_valid(&self) -> Result<bool, CacheError>;

    /// Returns the cached value if it is valid, never computing.
    fn try_get_value(&self) -> Result<Option<T>, CacheError>;

    /// Forces the next `value()` to compute again.
    fn invalidate(&self) -> Result<(), CacheError>;
}

impl<T, C: Cache<T> + ?Sized> Cache<T> for Arc<C> {
    type Error = C::Error;

    fn value(&self) -> Result<T, Self::Error> {
        (**self).value()
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        (**self).is_valid()
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        (**self).try_get_value()
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        (**self).invalidate()
    }
}

impl<T, C: Cache<T> + ?Sized> Cache<T> for Box<C> {
    type Error = C::Error;

    fn value(&self) -> Result<T, Self::Error> {
        (**self).value()
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        (**self).is_valid()
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        (**self).try_get_value()
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        (**self).invalidate()
    }
}

/// Pluggable behaviour of a [`CacheCore`].
///
/// A strategy decides how values are produced and when a stored value stops
/// being valid. Per-value bookkeeping lives in [`Meta`](CacheStrategy::Meta),
/// which the core keeps next to the value under its state lock.
///
/// `is_current_value_valid`, `store_value` and `on_invalidate` run while that
/// lock is held and must not call back into the same cache.
/// `create_value` runs without it and must not touch shared cache state.
///
/// # Examples
///
/// A cache that refuses to serve a value more than three times:
///
/// ```
/// use genlazy_core::{Cache, CacheCore, CacheError, CacheStrategy};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct ThreeUses {
///     served: AtomicUsize,
/// }
///
/// impl CacheStrategy for ThreeUses {
///     type Value = &'static str;
///     type Error = CacheError;
///     type Meta = ();
///
///     fn create_value(&self) -> Result<Self::Value, Self::Error> {
///         self.served.store(0, Ordering::SeqCst);
///         Ok("fresh")
///     }
///
///     fn is_current_value_valid(&self, _: &Self::Value, _: &()) -> bool {
///         self.served.fetch_add(1, Ordering::SeqCst) < 3
///     }
/// }
///
/// let cache = CacheCore::new(ThreeUses { served: AtomicUsize::new(0) });
/// assert_eq!(cache.value().unwrap(), "fresh");
/// ```
pub trait CacheStrategy {
    /// The cached value type. Cloned out on every read; wrap large values in
    /// an `Arc`.
    type Value: Clone;

    /// Error produced by [`create_value`](CacheStrategy::create_value).
    type Error: From<CacheError>;

    /// Validity bookkeeping stored alongside the value.
    type Meta: Default;

    /// Produces a fresh value.
    fn create_value(&self) -> Result<Self::Value, Self::Error>;

    /// Returns `true` while a stored value may still be served.
    fn is_current_value_valid(&self, _value: &Self::Value, _meta: &Self::Meta) -> bool {
        true
    }

    /// Records metadata for a value that is being published.
    fn store_value(&self, _value: &Self::Value, _meta: &mut Self::Meta) {}

    /// Resets metadata when the cache is invalidated.
    fn on_invalidate(&self, meta: &mut Self::Meta) {
        *meta = Self::Meta::default();
    }
}

/// Drives a [`CacheStrategy`] through a generation-fenced slot.
///
/// This is the building block behind [`LazyCache`](crate::LazyCache) and
/// [`ExpiringCache`](crate::ExpiringCache); use it directly to plug in a
/// custom validity rule.
pub struct CacheCore<S: CacheStrategy> {
    strategy: S,
    guard: GenerationGuard<S::Value, S::Meta>,
}

impl<S: CacheStrategy> CacheCore<S> {
    /// Creates an empty cache around `strategy`.
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            guard: GenerationGuard::new(),
        }
    }

    /// Returns the strategy this cache was built with.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the usage counters of this cache.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.guard.stats()
    }

    fn valid(&self) -> impl Fn(&S::Value, &S::Meta) -> bool + '_ {
        move |value: &S::Value, meta: &S::Meta| self.strategy.is_current_value_valid(value, meta)
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.guard.generation()
    }
}

impl<S: CacheStrategy> Cache<S::Value> for CacheCore<S> {
    type Error = S::Error;

    fn value(&self) -> Result<S::Value, S::Error> {
        self.guard.get_or_create(
            self.valid(),
            || self.strategy.create_value(),
            |value, meta| self.strategy.store_value(value, meta),
        )
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        self.guard.is_current(self.valid())
    }

    fn try_get_value(&self) -> Result<Option<S::Value>, CacheError> {
        self.guard.read(self.valid())
    }

    fn invalidate(&self) -> Result<(), CacheError> {
        self.guard.invalidate(|meta| self.strategy.on_invalidate(meta))
    }
}

impl<S: CacheStrategy> fmt::Debug for CacheCore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCore")
            .field("strategy", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}
