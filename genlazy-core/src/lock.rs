use crate::CacheError;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Returns a process-unique, non-zero identifier for the calling thread.
fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// A `parking_lot::Mutex` that remembers which thread holds it.
///
/// `parking_lot` mutexes are not reentrant: locking twice from the same
/// thread deadlocks. Cache locks are reachable from user hooks, so a second
/// acquisition from the owning thread is turned into
/// [`CacheError::Reentrancy`] instead.
///
/// The owner slot is only ever set to a thread's own token by that thread
/// while it holds the mutex, and is cleared before the mutex is released.
/// A thread can therefore only observe its own token there when it really
/// is the holder.
pub(crate) struct ExclusiveLock<T> {
    inner: Mutex<T>,
    owner: AtomicU64,
    name: &'static str,
}

impl<T> ExclusiveLock<T> {
    pub(crate) fn new(name: &'static str, value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            owner: AtomicU64::new(0),
            name,
        }
    }

    /// Acquires the lock, blocking while another thread holds it.
    ///
    /// Fails with [`CacheError::Reentrancy`] if the calling thread already
    /// holds this lock.
    pub(crate) fn lock(&self) -> Result<ExclusiveGuard<'_, T>, CacheError> {
        let me = current_thread_token();
        if self.owner.load(Ordering::Acquire) == me {
            tracing::warn!(lock = self.name, "rejected reentrant cache lock acquisition");
            return Err(CacheError::Reentrancy);
        }
        let guard = self.inner.lock();
        self.owner.store(me, Ordering::Release);
        Ok(ExclusiveGuard {
            guard,
            owner: &self.owner,
        })
    }

    /// Returns `true` if the calling thread currently holds this lock.
    #[cfg(test)]
    pub(crate) fn is_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Acquire) == current_thread_token()
    }
}

pub(crate) struct ExclusiveGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    owner: &'a AtomicU64,
}

impl<T> Drop for ExclusiveGuard<'_, T> {
    fn drop(&mut self) {
        // Runs before `guard` is dropped, so the owner is cleared while the
        // mutex is still held.
        self.owner.store(0, Ordering::Release);
    }
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
