//! # Named invalidation
//!
//! Invalidate groups of caches by name or by tag without holding on to the
//! cache handles yourself.
//!
//! The registry is an ordinary value: create one where the caches are
//! owned and pass it to whoever needs to trigger invalidation. Entries hold
//! weak handles, so registering a cache never extends its lifetime; caches
//! that have been dropped are skipped and pruned.
//!
//! # Examples
//!
//! ```rust
//! use genlazy_core::{Cache, InvalidationRegistry, LazyCache};
//! use std::sync::Arc;
//!
//! let registry = InvalidationRegistry::new();
//! let profile = Arc::new(LazyCache::new(|| "profile".to_string()));
//! let avatar = Arc::new(LazyCache::new(|| vec![0u8; 16]));
//!
//! registry.register("user_profile", &["user_data"], &profile);
//! registry.register("user_avatar", &["user_data", "images"], &avatar);
//!
//! profile.value().unwrap();
//! avatar.value().unwrap();
//!
//! // Invalidate all caches tagged with "user_data"
//! assert_eq!(registry.invalidate_by_tag("user_data").unwrap(), 2);
//! assert!(!profile.is_valid().unwrap());
//! assert!(!avatar.is_valid().unwrap());
//! ```

use crate::{Cache, CacheError};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Invalidates the registered cache, or returns `None` once it was dropped.
type InvalidateFn = Arc<dyn Fn() -> Option<Result<(), CacheError>> + Send + Sync>;

struct Registration {
    /// Distinguishes this registration from later ones under the same name.
    id: u64,
    tags: Vec<String>,
    invalidate: InvalidateFn,
}

/// Maps cache names and tags to invalidation callbacks.
///
/// Writers take `caches` before `tag_to_caches` and hold both for the whole
/// update, so the two maps always agree.
#[derive(Default)]
pub struct InvalidationRegistry {
    /// Map from cache name to its registration
    caches: RwLock<HashMap<String, Registration>>,
    /// Map from tag to set of cache names
    tag_to_caches: RwLock<HashMap<String, HashSet<String>>>,
    next_id: AtomicU64,
}

fn detach_tags(tag_map: &mut HashMap<String, HashSet<String>>, name: &str, tags: &[String]) {
    for tag in tags {
        if let Some(names) = tag_map.get_mut(tag) {
            names.remove(name);
            if names.is_empty() {
                tag_map.remove(tag);
            }
        }
    }
}

impl InvalidationRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache under `name` with the given tags.
    ///
    /// Registering an existing name replaces the previous entry and its tags.
    pub fn register<T, C>(&self, name: &str, tags: &[&str], cache: &Arc<C>)
    where
        T: 'static,
        C: Cache<T> + Send + Sync + 'static,
    {
        let handle: Weak<C> = Arc::downgrade(cache);
        let invalidate: InvalidateFn =
            Arc::new(move || handle.upgrade().map(|c| <C as Cache<T>>::invalidate(&c)));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut caches = self.caches.write();
        let mut tag_map = self.tag_to_caches.write();

        if let Some(previous) = caches.remove(name) {
            detach_tags(&mut tag_map, name, &previous.tags);
        }
        for tag in tags {
            tag_map
                .entry(tag.to_string())
                .or_default()
                .insert(name.to_string());
        }
        caches.insert(
            name.to_string(),
            Registration {
                id,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                invalidate,
            },
        );
        tracing::trace!(cache = name, ?tags, "registered cache for invalidation");
    }

    /// Remove a cache from the registry.
    ///
    /// # Returns
    ///
    /// `true` if a cache was registered under `name`
    pub fn unregister(&self, name: &str) -> bool {
        self.remove(name, None)
    }

    /// Removes `name`, but only if it still holds registration `only_id`
    /// when one is given.
    fn remove(&self, name: &str, only_id: Option<u64>) -> bool {
        let mut caches = self.caches.write();
        let mut tag_map = self.tag_to_caches.write();

        let matches = caches
            .get(name)
            .is_some_and(|r| only_id.map_or(true, |id| r.id == id));
        if !matches {
            return false;
        }
        match caches.remove(name) {
            Some(registration) => {
                detach_tags(&mut tag_map, name, &registration.tags);
                true
            }
            None => false,
        }
    }

    /// Invalidate a specific cache by name.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a live cache was found and invalidated
    pub fn invalidate_cache(&self, name: &str) -> Result<bool, CacheError> {
        let callback = self
            .caches
            .read()
            .get(name)
            .map(|r| (r.id, Arc::clone(&r.invalidate)));

        let Some((id, invalidate)) = callback else {
            return Ok(false);
        };
        match invalidate() {
            Some(result) => result.map(|()| true),
            None => {
                self.remove(name, Some(id));
                Ok(false)
            }
        }
    }

    /// Invalidate all caches associated with a tag.
    ///
    /// Callbacks run after the registry locks are released, so a cache hook
    /// may use the registry again.
    ///
    /// # Returns
    ///
    /// Number of live caches invalidated. The first failing invalidation
    /// aborts the pass and is returned.
    pub fn invalidate_by_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let callbacks: Vec<(String, u64, InvalidateFn)> = {
            let caches = self.caches.read();
            let tag_map = self.tag_to_caches.read();
            tag_map
                .get(tag)
                .into_iter()
                .flatten()
                .filter_map(|name| {
                    let registration = caches.get(name)?;
                    Some((
                        name.clone(),
                        registration.id,
                        Arc::clone(&registration.invalidate),
                    ))
                })
                .collect()
        };

        let mut count = 0;
        let mut dead = Vec::new();
        for (name, id, invalidate) in callbacks {
            match invalidate() {
                Some(result) => {
                    result?;
                    count += 1;
                }
                None => dead.push((name, id)),
            }
        }

        for (name, id) in &dead {
            self.remove(name, Some(*id));
        }
        tracing::debug!(tag, count, pruned = dead.len(), "invalidated caches by tag");
        Ok(count)
    }

    /// Get the names of all caches associated with a tag
    pub fn caches_by_tag(&self, tag: &str) -> Vec<String> {
        self.tag_to_caches
            .read()
            .get(tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if a cache is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Clear all registrations
    pub fn clear(&self) {
        let mut caches = self.caches.write();
        let mut tag_map = self.tag_to_caches.write();
        caches.clear();
        tag_map.clear();
    }
}

impl fmt::Debug for InvalidationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRegistry")
            .field("caches", &self.caches.read().len())
            .field("tags", &self.tag_to_caches.read().len())
            .finish()
    }
}
