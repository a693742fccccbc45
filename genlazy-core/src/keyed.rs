use crate::guard::GenerationGuard;
use crate::{Cache, CacheError};
#[cfg(feature = "stats")]
use crate::CacheStats;
use std::fmt;
use std::sync::atomic::{fence, Ordering};

type KeySelector<K> = Box<dyn Fn() -> K + Send + Sync>;
type KeyedFactory<K, T, E> = Box<dyn Fn(&K) -> Result<T, E> + Send + Sync>;

/// A cache whose value is a function of an externally owned, changing key.
///
/// The key is observed through a selector (typically reading a version
/// stamp kept elsewhere). A value is valid only for the key it was computed
/// from; when the observed key changes, the old value is dropped and a new
/// one is computed.
///
/// [`value`](Cache::value) reads the key, then gets the value held for it or
/// computes a new one. A computation reads the key once more and builds the
/// value for exactly that key. Finally the key is read again: if it no longer
/// matches the key the value belongs to, the value is discarded and the
/// cycle repeats with the newer key. The returned value therefore always
/// belongs to the key as seen at the moment of return.
///
/// The retry loop is unbounded: a key that never holds still for one
/// read-compute-read cycle keeps `value()` spinning. Callers must make sure
/// the key eventually settles.
///
/// # Examples
///
/// ```
/// use genlazy_core::{Cache, KeyedVolatileCache};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
///
/// let version = Arc::new(AtomicU64::new(1));
/// let observed = Arc::clone(&version);
/// let cache = KeyedVolatileCache::new(
///     move || observed.load(Ordering::SeqCst),
///     |v: &u64| format!("schema v{v}"),
/// );
///
/// assert_eq!(cache.value().unwrap(), "schema v1");
/// version.store(2, Ordering::SeqCst);
/// assert!(!cache.is_valid().unwrap());
/// assert_eq!(cache.value().unwrap(), "schema v2");
/// ```
pub struct KeyedVolatileCache<K, T, E = CacheError> {
    key: KeySelector<K>,
    factory: KeyedFactory<K, T, E>,
    /// Each value is stored with the key it was computed for.
    guard: GenerationGuard<(K, T)>,
}

impl<K, T> KeyedVolatileCache<K, T>
where
    K: Clone + PartialEq,
    T: Clone,
{
    /// Creates a cache from a key selector and an infallible factory.
    pub fn new<S, F>(key: S, factory: F) -> Self
    where
        S: Fn() -> K + Send + Sync + 'static,
        F: Fn(&K) -> T + Send + Sync + 'static,
    {
        Self::try_new(key, move |k: &K| Ok(factory(k)))
    }
}

impl<K, T, E> KeyedVolatileCache<K, T, E>
where
    K: Clone + PartialEq,
    T: Clone,
    E: From<CacheError>,
{
    /// Creates a cache from a key selector and a fallible factory.
    pub fn try_new<S, F>(key: S, factory: F) -> Self
    where
        S: Fn() -> K + Send + Sync + 'static,
        F: Fn(&K) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            key: Box::new(key),
            factory: Box::new(factory),
            guard: GenerationGuard::new(),
        }
    }

    /// Reads the key with full fences on both sides, so the read can be
    /// reordered neither into nor out of the surrounding computation.
    fn observe_key(&self) -> K {
        fence(Ordering::SeqCst);
        let key = (self.key)();
        fence(Ordering::SeqCst);
        key
    }

    /// Observes the key and computes the value for it.
    fn compute(&self) -> Result<(K, T), E> {
        let key = self.observe_key();
        let value = (self.factory)(&key)?;
        Ok((key, value))
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.guard.stats()
    }
}

fn computed_for<K: PartialEq, T>(key: &K) -> impl Fn(&(K, T), &()) -> bool + '_ {
    move |(stored, _): &(K, T), _: &()| stored == key
}

impl<K, T, E> Cache<T> for KeyedVolatileCache<K, T, E>
where
    K: Clone + PartialEq,
    T: Clone,
    E: From<CacheError>,
{
    type Error = E;

    fn value(&self) -> Result<T, E> {
        let mut before = self.observe_key();
        loop {
            let (computed, value) =
                self.guard
                    .get_or_create(computed_for(&before), || self.compute(), |_, _| {})?;

            let after = self.observe_key();
            if after == computed {
                return Ok(value);
            }

            tracing::debug!("volatile cache key changed while producing value, retrying");
            before = after;
        }
    }

    fn is_valid(&self) -> Result<bool, CacheError> {
        let key = self.observe_key();
        self.guard.is_current(computed_for(&key))
    }

    fn try_get_value(&self) -> Result<Option<T>, CacheError> {
        let key = self.observe_key();
        Ok(self.guard.read(computed_for(&key))?.map(|(_, value)| value))
    }

    /// Drops the held entry. Whatever key it was computed for, the next
    /// `value()` recomputes for the key observed then.
    fn invalidate(&self) -> Result<(), CacheError> {
        self.guard.invalidate(|_| {})
    }
}

impl<K, T, E> fmt::Debug for KeyedVolatileCache<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedVolatileCache").finish_non_exhaustive()
    }
}
