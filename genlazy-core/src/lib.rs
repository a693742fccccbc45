//! # Genlazy Core
//!
//! Invalidatable lazy value caches for the Genlazy library.
//!
//! Every cache here holds a single value that is computed on demand, served
//! from memory afterwards, and dropped again on invalidation or when a
//! variant-specific validity condition stops holding.
//!
//! ## Features
//!
//! - **Generation fencing**: a value computed while an invalidation happened
//!   is thrown away, never published
//! - **Single computation**: concurrent callers wait for one factory run
//!   instead of racing
//! - **Non-blocking checks**: `is_valid`, `try_get_value` and `invalidate`
//!   never wait for a running computation
//! - **Reentrancy detection**: re-entering a held cache lock from the same
//!   thread fails with [`CacheError::Reentrancy`] instead of deadlocking
//! - **Failures are not cached**: a factory error leaves the cache as if
//!   `value()` had never been called
//!
//! ## Module Organization
//!
//! - [`Cache`] / [`CacheStrategy`] / [`CacheCore`] - the contract and the
//!   strategy-driven core
//! - [`LazyCache`] - valid until invalidated
//! - [`ExpiringCache`] - valid for a fixed [`Expiry`] window
//! - [`KeyedVolatileCache`] - valid while an externally observed key is unchanged
//! - [`ConstantCache`] / [`UncachedCache`] - always valid / never valid
//! - [`CacheBuilder`] - construction from options
//! - [`InvalidationRegistry`] - invalidate caches by name or tag
//!
mod builder;
mod cache;
mod constant;
mod error;
mod expiring;
mod guard;
mod keyed;
mod lazy;
mod lock;

pub mod registry;

#[cfg(feature = "stats")]
mod stats;

pub use builder::{BoxedCache, CacheBuilder};
pub use cache::{Cache, CacheCore, CacheStrategy};
pub use constant::{ConstantCache, UncachedCache};
pub use error::CacheError;
pub use expiring::{ExpiringCache, Expiry};
pub use keyed::KeyedVolatileCache;
pub use lazy::LazyCache;
pub use registry::InvalidationRegistry;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
