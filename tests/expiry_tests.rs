use genlazy::{Cache, CacheBuilder, CacheError, ConstantCache, Expiry, ExpiringCache, UncachedCache};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn counting(expiry: Expiry) -> (Arc<AtomicUsize>, ExpiringCache<usize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = ExpiringCache::new(expiry, move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();
    (calls, cache)
}

#[test]
#[serial]
fn test_expiry_boundary_100ms() {
    let (calls, cache) = counting(Expiry::After(Duration::from_millis(100)));

    assert_eq!(cache.value().unwrap(), 0);
    assert!(cache.is_valid().unwrap());

    thread::sleep(Duration::from_millis(150));
    assert!(!cache.is_valid().unwrap());

    assert_eq!(cache.value().unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_window_restarts_on_each_store() {
    let (calls, cache) = counting(Expiry::After(Duration::from_millis(200)));

    cache.value().unwrap();
    thread::sleep(Duration::from_millis(250));
    cache.value().unwrap();

    // The second value was stored just now, so it is still fresh.
    assert!(cache.is_valid().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_never_expires_without_invalidate() {
    let (calls, cache) = counting(Expiry::Never);

    cache.value().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(cache.is_valid().unwrap());

    cache.invalidate().unwrap();
    assert!(!cache.is_valid().unwrap());
    assert_eq!(cache.value().unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_zero_window_is_a_construction_error() {
    let err = ExpiringCache::new(Expiry::After(Duration::ZERO), || 0).unwrap_err();
    assert!(matches!(err, CacheError::InvalidConfiguration { .. }));

    let err = CacheBuilder::new(|| 0)
        .expire_after(Duration::ZERO)
        .build()
        .err();
    assert!(matches!(err, Some(CacheError::InvalidConfiguration { .. })));
}

#[test]
#[serial]
fn test_expiry_composes_over_degenerate_caches() {
    let constant = ExpiringCache::wrap(Duration::from_millis(30), ConstantCache::new(5)).unwrap();
    assert_eq!(constant.value().unwrap(), 5);
    thread::sleep(Duration::from_millis(50));
    assert!(!constant.is_valid().unwrap());
    assert_eq!(constant.value().unwrap(), 5);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let uncached = ExpiringCache::wrap(
        Duration::from_millis(30),
        UncachedCache::new(move || counter.fetch_add(1, Ordering::SeqCst)),
    )
    .unwrap();

    assert_eq!(uncached.value().unwrap(), 0);
    assert_eq!(uncached.value().unwrap(), 0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(uncached.value().unwrap(), 1);
}
