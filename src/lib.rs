//! # Genlazy
//!
//! Lazily computed, invalidatable values that stay correct under concurrent
//! invalidation.
//!
//! ## Features
//!
//! - **Lazy**: the factory runs on first access and its result is reused
//! - **Invalidatable**: `invalidate()` forces a recompute, even one that is
//!   already in flight on another thread
//! - **Expiring**: values can carry a time-to-live window
//! - **Keyed**: values can follow an externally owned version key
//! - **Result-aware**: factory errors propagate unchanged and are never cached
//!
//! ## Quick Start
//!
//! ```rust
//! use genlazy::{Cache, LazyCache};
//!
//! let settings = LazyCache::new(|| {
//!     // expensive load
//!     vec!["a".to_string(), "b".to_string()]
//! });
//!
//! // First call computes the value
//! let first = settings.value().unwrap();
//! // Second call returns the cached value
//! let second = settings.value().unwrap();
//! assert_eq!(first, second);
//!
//! // Drop it; the next access computes again
//! settings.invalidate().unwrap();
//! assert!(!settings.is_valid().unwrap());
//! ```
//!
//! ## Expiring Values
//!
//! ```rust
//! use genlazy::{Cache, Expiry, ExpiringCache};
//! use std::time::Duration;
//!
//! let token = ExpiringCache::new(Expiry::After(Duration::from_secs(300)), || "token-123").unwrap();
//! assert_eq!(token.value().unwrap(), "token-123");
//!
//! // A zero window is a configuration error, not a silently uncached value
//! assert!(ExpiringCache::new(Duration::ZERO, || "never").is_err());
//! ```
//!
//! ## Values Following a Version Key
//!
//! ```rust
//! use genlazy::{Cache, KeyedVolatileCache};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let version = Arc::new(AtomicU64::new(1));
//! let observed = Arc::clone(&version);
//! let index = KeyedVolatileCache::new(
//!     move || observed.load(Ordering::SeqCst),
//!     |v: &u64| format!("index built from v{v}"),
//! );
//!
//! assert_eq!(index.value().unwrap(), "index built from v1");
//! version.store(2, Ordering::SeqCst);
//! assert_eq!(index.value().unwrap(), "index built from v2");
//! ```
//!
//! ## Error Handling
//!
//! Fallible factories return their own error type, which only needs to be
//! convertible from [`CacheError`]:
//!
//! ```rust
//! use genlazy::{Cache, CacheError, LazyCache};
//!
//! #[derive(Debug, PartialEq)]
//! enum FetchError {
//!     Offline,
//!     Cache(CacheError),
//! }
//!
//! impl From<CacheError> for FetchError {
//!     fn from(e: CacheError) -> Self {
//!         FetchError::Cache(e)
//!     }
//! }
//!
//! let remote: LazyCache<String, FetchError> = LazyCache::try_new(|| Err(FetchError::Offline));
//!
//! // Err results are NOT cached
//! assert_eq!(remote.value(), Err(FetchError::Offline));
//! assert!(!remote.is_valid().unwrap());
//! ```

pub use genlazy_core::*;
