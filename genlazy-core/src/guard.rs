use crate::lock::ExclusiveLock;
use crate::CacheError;
#[cfg(feature = "stats")]
use crate::CacheStats;

/// State protected by the short-held state lock.
struct Slot<T, M> {
    generation: u64,
    value: Option<T>,
    meta: M,
}

impl<T: Clone, M: Default> Slot<T, M> {
    fn holds_valid<V>(&self, valid: &V) -> bool
    where
        V: Fn(&T, &M) -> bool,
    {
        matches!(&self.value, Some(v) if valid(v, &self.meta))
    }

    /// Returns the stored value if it is still valid, otherwise drops the
    /// stale value together with its metadata.
    fn current<V>(&mut self, valid: &V) -> Option<T>
    where
        V: Fn(&T, &M) -> bool,
    {
        if self.holds_valid(valid) {
            self.value.clone()
        } else {
            self.reset();
            None
        }
    }

    fn reset(&mut self) {
        if self.value.is_some() {
            self.value = None;
            self.meta = M::default();
        }
    }
}

/// Generation-fenced lazy value slot.
///
/// `GenerationGuard` is the primitive every invalidatable cache in this crate
/// is built on. It owns:
///
/// - a **generation counter**, bumped by [`invalidate`](Self::invalidate) and
///   by nothing else,
/// - the **current value** together with per-variant metadata `M` (a store
///   timestamp, the key a value was computed for, ...),
/// - a **state lock** guarding the two above, held only for short critical
///   sections and never while user code computes a value,
/// - a **compute lock** serializing value creation per instance.
///
/// # Race protocol
///
/// A computing thread snapshots the generation before calling the factory
/// and publishes the result only if the generation is unchanged afterwards.
/// An invalidation that lands while the factory runs therefore makes the
/// computing thread throw its value away and compute again, so a value
/// produced before an invalidation is never published after it.
///
/// The validity predicate and the store / invalidate hooks run while the
/// state lock is held. Calling back into the same cache from them on the
/// same thread yields [`CacheError::Reentrancy`].
pub(crate) struct GenerationGuard<T, M = ()> {
    state: ExclusiveLock<Slot<T, M>>,
    compute: ExclusiveLock<()>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<T: Clone, M: Default> GenerationGuard<T, M> {
    pub(crate) fn new() -> Self {
        Self {
            state: ExclusiveLock::new(
                "state",
                Slot {
                    generation: 0,
                    value: None,
                    meta: M::default(),
                },
            ),
            compute: ExclusiveLock::new("compute", ()),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// Returns the current value if `valid` accepts it, without ever
    /// computing. A rejected value is cleared.
    pub(crate) fn read<V>(&self, valid: V) -> Result<Option<T>, CacheError>
    where
        V: Fn(&T, &M) -> bool,
    {
        Ok(self.state.lock()?.current(&valid))
    }

    /// Like [`read`](Self::read) but without cloning the value out.
    pub(crate) fn is_current<V>(&self, valid: V) -> Result<bool, CacheError>
    where
        V: Fn(&T, &M) -> bool,
    {
        let mut slot = self.state.lock()?;
        if slot.holds_valid(&valid) {
            Ok(true)
        } else {
            slot.reset();
            Ok(false)
        }
    }

    /// Returns the current value, computing it with `create` if needed.
    ///
    /// `store` runs in the same critical section that publishes the value, so
    /// metadata such as a timestamp becomes visible atomically with it.
    ///
    /// Errors from `create` propagate unchanged and leave the slot untouched.
    pub(crate) fn get_or_create<E, V, C, S>(
        &self,
        valid: V,
        mut create: C,
        store: S,
    ) -> Result<T, E>
    where
        E: From<CacheError>,
        V: Fn(&T, &M) -> bool,
        C: FnMut() -> Result<T, E>,
        S: Fn(&T, &mut M),
    {
        if let Some(value) = self.read(&valid)? {
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return Ok(value);
        }

        #[cfg(feature = "stats")]
        self.stats.record_miss();

        let _computing = self.compute.lock()?;
        loop {
            let generation = {
                let mut slot = self.state.lock()?;
                // Another thread may have published while we waited.
                if let Some(value) = slot.current(&valid) {
                    return Ok(value);
                }
                slot.generation
            };

            tracing::trace!(generation, "computing cache value");
            #[cfg(feature = "stats")]
            self.stats.record_computation();
            let value = create()?;

            let mut slot = self.state.lock()?;
            if slot.generation == generation {
                store(&value, &mut slot.meta);
                slot.value = Some(value.clone());
                tracing::trace!(generation, "published cache value");
                return Ok(value);
            }

            tracing::debug!(
                snapshot = generation,
                current = slot.generation,
                "cache invalidated during computation, discarding value"
            );
            #[cfg(feature = "stats")]
            self.stats.record_discarded();
        }
    }

    /// Advances the generation, drops the current value and lets
    /// `on_invalidate` reset the metadata.
    ///
    /// Never waits for an in-flight computation; that computation will see
    /// the new generation and start over.
    pub(crate) fn invalidate<F>(&self, on_invalidate: F) -> Result<(), CacheError>
    where
        F: FnOnce(&mut M),
    {
        let mut slot = self.state.lock()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = None;
        on_invalidate(&mut slot.meta);
        tracing::trace!(generation = slot.generation, "cache invalidated");
        #[cfg(feature = "stats")]
        self.stats.record_invalidation();
        Ok(())
    }

    #[cfg(feature = "stats")]
    pub(crate) fn stats(&self) -> &CacheStats {
        &self.stats
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.state.lock().map(|slot| slot.generation).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn always(_: &usize, _: &()) -> bool {
        true
    }

    fn no_meta(_: &usize, _: &mut ()) {}

    #[test]
    fn test_create_once_then_read() {
        let guard: GenerationGuard<usize> = GenerationGuard::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..5 {
            let v: Result<usize, CacheError> = guard.get_or_create(
                always,
                || Ok(calls.fetch_add(1, Ordering::SeqCst) + 10),
                no_meta,
            );
            assert_eq!(v.unwrap(), 10);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.read(always).unwrap(), Some(10));
    }

    #[test]
    fn test_invalidate_bumps_generation_and_clears() {
        let guard: GenerationGuard<usize> = GenerationGuard::new();
        let _ = guard.get_or_create::<CacheError, _, _, _>(always, || Ok(1), no_meta);

        for n in 1..=3 {
            guard.invalidate(|_| {}).unwrap();
            assert_eq!(guard.generation(), n);
            assert!(!guard.is_current(always).unwrap());
        }
    }

    #[test]
    fn test_rejected_value_is_reset_with_metadata() {
        let guard: GenerationGuard<usize, Option<u8>> = GenerationGuard::new();
        let _ = guard.get_or_create::<CacheError, _, _, _>(
            |_, _| true,
            || Ok(7),
            |_, meta| *meta = Some(1),
        );

        assert_eq!(guard.read(|_, meta| meta.is_some()).unwrap(), Some(7));
        assert_eq!(guard.read(|_, _| false).unwrap(), None);
        // The reset dropped the metadata along with the value.
        assert_eq!(guard.read(|_, meta| meta.is_none()).unwrap(), None);
        assert_eq!(guard.generation(), 0);
    }

    #[test]
    fn test_failed_create_is_not_cached() {
        let guard: GenerationGuard<usize> = GenerationGuard::new();

        let err: Result<usize, CacheError> =
            guard.get_or_create(always, || Err(CacheError::invalid("boom")), no_meta);
        assert!(err.is_err());
        assert_eq!(guard.read(always).unwrap(), None);

        let ok: Result<usize, CacheError> = guard.get_or_create(always, || Ok(3), no_meta);
        assert_eq!(ok.unwrap(), 3);
    }

    #[test]
    fn test_invalidate_during_compute_forces_recompute() {
        let guard: Arc<GenerationGuard<usize>> = Arc::new(GenerationGuard::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();

        let worker = {
            let guard = Arc::clone(&guard);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                guard.get_or_create::<CacheError, _, _, _>(
                    always,
                    || {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n == 0 {
                            started_tx.send(()).unwrap();
                            resume_rx.recv().unwrap();
                        }
                        Ok(n)
                    },
                    no_meta,
                )
            })
        };

        started_rx.recv().unwrap();
        guard.invalidate(|_| {}).unwrap();
        resume_tx.send(()).unwrap();

        // The value computed before the invalidation (0) must never surface.
        assert_eq!(worker.join().unwrap().unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.read(always).unwrap(), Some(1));
    }

    #[test]
    fn test_concurrent_callers_compute_once() {
        let guard: Arc<GenerationGuard<usize>> = Arc::new(GenerationGuard::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    guard
                        .get_or_create::<CacheError, _, _, _>(
                            always,
                            || {
                                thread::sleep(Duration::from_millis(20));
                                Ok(calls.fetch_add(1, Ordering::SeqCst) + 100)
                            },
                            no_meta,
                        )
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 100);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_access_from_validity_hook_fails_fast() {
        let guard: Arc<GenerationGuard<usize>> = Arc::new(GenerationGuard::new());
        let _ = guard.get_or_create::<CacheError, _, _, _>(always, || Ok(1), no_meta);

        let inner = Arc::clone(&guard);
        let seen = parking_lot::Mutex::new(None);
        let result = guard.read(|_, _| {
            *seen.lock() = Some(inner.invalidate(|_| {}));
            true
        });

        assert_eq!(result.unwrap(), Some(1));
        assert_eq!(seen.into_inner(), Some(Err(CacheError::Reentrancy)));
    }

    #[test]
    fn test_reentrant_value_from_factory_fails_fast() {
        let guard: Arc<GenerationGuard<usize>> = Arc::new(GenerationGuard::new());
        let inner = Arc::clone(&guard);

        let result: Result<usize, CacheError> = guard.get_or_create(
            always,
            || inner.get_or_create(always, || Ok(2), no_meta),
            no_meta,
        );

        assert_eq!(result, Err(CacheError::Reentrancy));
        assert_eq!(guard.read(always).unwrap(), None);
    }

    #[test]
    fn test_factory_invalidating_its_own_guard_retries() {
        let guard: Arc<GenerationGuard<usize>> = Arc::new(GenerationGuard::new());
        let inner = Arc::clone(&guard);
        let calls = AtomicUsize::new(0);

        let result: Result<usize, CacheError> = guard.get_or_create(
            always,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    // Only the state lock is taken here, which the factory
                    // does not hold.
                    inner.invalidate(|_| {})?;
                }
                Ok(n)
            },
            no_meta,
        );

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.generation(), 1);
        assert_eq!(guard.read(always).unwrap(), Some(1));
    }

    #[cfg(feature = "stats")]
    #[test]
    fn test_stats_track_race_outcomes() {
        let guard: GenerationGuard<usize> = GenerationGuard::new();
        let _ = guard.get_or_create::<CacheError, _, _, _>(always, || Ok(1), no_meta);
        let _ = guard.get_or_create::<CacheError, _, _, _>(always, || Ok(1), no_meta);
        guard.invalidate(|_| {}).unwrap();

        let stats = guard.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.computations(), 1);
        assert_eq!(stats.invalidations(), 1);
        assert_eq!(stats.discarded(), 0);
    }
}
