//! Pattern cache.
//!
//! Memoizes the full pattern set fetched from a [`PatternStore`] for a fixed
//! lifetime. Expiry is checked when the cache is read; there is no background
//! timer.
//!
//! The snapshot is an `Arc<PatternSet>` that is replaced as a whole. Readers
//! clone the `Arc` under a short read lock and then work on an immutable set,
//! so a reader never observes a partially written map.
//!
//! Every invalidation bumps a generation counter. A load only stores what it
//! fetched if no invalidation happened since the fetch began, so a slow read
//! can never overwrite the cache with a set older than a completed write.
//!
//! A failed fetch never fails the caller: the built-in defaults are returned
//! instead and are not cached, so the next load retries the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::default_patterns::{default_general_pattern, default_patterns};
use crate::config::DEFAULT_CACHE_TTL;
use crate::models::{GENERAL_DOMAIN, Pattern, PatternSet};
use crate::storage::PatternStore;
use crate::{Error, Result};

/// A cached snapshot and when it was fetched.
struct Snapshot {
    patterns: Arc<PatternSet>,
    loaded_at: Instant,
}

/// Time-bounded cache in front of a pattern store.
pub struct PatternCache {
    store: Arc<dyn PatternStore>,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    /// Bumped by every invalidation, under the snapshot write lock.
    generation: AtomicU64,
    /// Serializes read-modify-write cycles against the store.
    write_lock: Mutex<()>,
}

impl PatternCache {
    /// Creates a cache with the default lifetime.
    #[must_use]
    pub fn new(store: Arc<dyn PatternStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_CACHE_TTL,
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Sets the cache lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PatternStore> {
        &self.store
    }

    /// Returns the active pattern set.
    ///
    /// Served from the snapshot unless it is missing, expired, or
    /// `force_refresh` is set.
    pub fn load(&self, force_refresh: bool) -> Arc<PatternSet> {
        if !force_refresh
            && let Some(patterns) = self.cached()
        {
            metrics::counter!("pattern_cache_hits_total").increment(1);
            return patterns;
        }
        metrics::counter!("pattern_cache_misses_total").increment(1);

        let generation = self.generation.load(Ordering::Acquire);
        match self.fetch() {
            Ok(patterns) => {
                let patterns = Arc::new(patterns);
                let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
                if self.generation.load(Ordering::Acquire) == generation {
                    *snapshot = Some(Snapshot {
                        patterns: Arc::clone(&patterns),
                        loaded_at: Instant::now(),
                    });
                } else {
                    tracing::debug!("Patterns changed during fetch, not caching the result");
                }
                drop(snapshot);
                tracing::debug!(
                    backend = self.store.backend_name(),
                    count = patterns.len(),
                    "Loaded patterns from store"
                );
                patterns
            },
            Err(e) => {
                tracing::warn!(
                    backend = self.store.backend_name(),
                    error = %e,
                    "Pattern store unavailable, serving built-in patterns"
                );
                Arc::new(default_patterns())
            },
        }
    }

    /// Drops the snapshot; the next load fetches from the store.
    pub fn invalidate(&self) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::AcqRel);
        *snapshot = None;
    }

    /// Returns true if an unexpired snapshot is held.
    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.cached().is_some()
    }

    /// Returns one pattern from the active set.
    pub fn get(&self, domain: &str, force_refresh: bool) -> Option<Pattern> {
        self.load(force_refresh).get(domain).cloned()
    }

    /// Adds a pattern for a new domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the pattern is invalid or the
    /// domain already exists, or the store error if the write fails.
    pub fn add(&self, pattern: Pattern) -> Result<()> {
        pattern.validate()?;
        let domain = pattern.domain.clone();
        self.modify(|set| {
            if set.contains(&domain) {
                return Err(Error::InvalidInput(format!(
                    "pattern '{domain}' already exists; use update to replace it"
                )));
            }
            set.upsert(pattern);
            Ok(())
        })
    }

    /// Inserts or replaces a pattern.
    ///
    /// Returns true if the domain already existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the pattern is invalid, or the store
    /// error if the read or write fails.
    pub fn upsert(&self, pattern: Pattern) -> Result<bool> {
        pattern.validate()?;
        self.modify(|set| Ok(set.upsert(pattern)))
    }

    /// Removes a pattern.
    ///
    /// Returns false if the domain did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for the fallback domain, or the store
    /// error if the read or write fails.
    pub fn remove(&self, domain: &str) -> Result<bool> {
        if domain == GENERAL_DOMAIN {
            return Err(Error::InvalidInput(format!(
                "the '{GENERAL_DOMAIN}' pattern cannot be deleted"
            )));
        }
        self.modify(|set| Ok(set.remove(domain).is_some()))
    }

    /// Runs a read-modify-write cycle against the store, then invalidates.
    ///
    /// The store is written only when `change` succeeds.
    fn modify<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut PatternSet) -> Result<T>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Writes start from the store, never from defaults.
        let mut set = self.store.get_all()?;
        let outcome = change(&mut set)?;
        set.ensure_fallback(default_general_pattern());
        self.store.replace_all(&set)?;
        self.invalidate();
        Ok(outcome)
    }

    fn cached(&self) -> Option<Arc<PatternSet>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|snapshot| snapshot.loaded_at.elapsed() < self.ttl)
            .map(|snapshot| Arc::clone(&snapshot.patterns))
    }

    fn fetch(&self) -> Result<PatternSet> {
        let mut set = self.store.get_all()?;
        if set.ensure_fallback(default_general_pattern()) {
            tracing::debug!("Store has no general pattern, appended built-in fallback");
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryPatternStore;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, Receiver, Sender};

    /// Store that always fails.
    struct DownStore {
        calls: AtomicUsize,
    }

    impl PatternStore for DownStore {
        fn get_all(&self) -> Result<PatternSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::upstream("pattern store", "connection refused"))
        }

        fn replace_all(&self, _patterns: &PatternSet) -> Result<()> {
            Err(Error::upstream("pattern store", "connection refused"))
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    /// Store whose first read pauses after reading, until released.
    struct PausingStore {
        inner: InMemoryPatternStore,
        gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    }

    impl PatternStore for PausingStore {
        fn get_all(&self) -> Result<PatternSet> {
            let set = self.inner.get_all()?;
            let gate = self.gate.lock().unwrap().take();
            if let Some((reached, resume)) = gate {
                reached.send(()).unwrap();
                resume.recv().unwrap();
            }
            Ok(set)
        }

        fn replace_all(&self, patterns: &PatternSet) -> Result<()> {
            self.inner.replace_all(patterns)
        }

        fn backend_name(&self) -> &'static str {
            "pausing"
        }
    }

    fn cache() -> (Arc<InMemoryPatternStore>, PatternCache) {
        let store = Arc::new(InMemoryPatternStore::with_defaults());
        let cache = PatternCache::new(store.clone());
        (store, cache)
    }

    #[test]
    fn test_hit_within_ttl() {
        let (store, cache) = cache();
        let first = cache.load(false);
        let second = cache.load(false);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetch_count(), 1);
        assert!(cache.is_warm());
    }

    #[test]
    fn test_force_refresh_fetches() {
        let (store, cache) = cache();
        cache.load(false);
        cache.load(true);
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_zero_ttl_always_fetches() {
        let store = Arc::new(InMemoryPatternStore::with_defaults());
        let cache = PatternCache::new(store.clone()).with_ttl(Duration::ZERO);
        cache.load(false);
        cache.load(false);
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_upsert_invalidates() {
        let (store, cache) = cache();
        cache.load(false);

        let existed = cache
            .upsert(Pattern::new("x").with_keywords(["xylophone"]))
            .unwrap();
        assert!(!existed);
        assert!(!cache.is_warm());

        let pattern = cache.get("x", false).unwrap();
        assert_eq!(pattern.trigger_keywords, vec!["xylophone"]);
        // initial load, read-modify-write, reload
        assert_eq!(store.fetch_count(), 3);
    }

    #[test]
    fn test_slow_read_does_not_hide_concurrent_write() {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        let store = Arc::new(PausingStore {
            inner: InMemoryPatternStore::with_defaults(),
            gate: Mutex::new(Some((reached_tx, resume_rx))),
        });
        let cache = Arc::new(PatternCache::new(store));

        let reader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.load(false))
        };
        reached_rx.recv().unwrap();

        cache
            .upsert(Pattern::new("x").with_keywords(["xylophone"]))
            .unwrap();
        resume_tx.send(()).unwrap();

        let stale = reader.join().unwrap();
        assert!(!stale.contains("x"));
        assert!(!cache.is_warm());
        assert!(cache.get("x", false).is_some());
    }

    #[test]
    fn test_add_rejects_existing() {
        let (_, cache) = cache();
        let err = cache
            .add(Pattern::new("marketing_copy").with_keywords(["ads"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        cache.add(Pattern::new("legal").with_keywords(["contract"])).unwrap();
        assert!(cache.load(false).contains("legal"));
    }

    #[test]
    fn test_remove() {
        let (_, cache) = cache();
        assert!(cache.remove("code_generation").unwrap());
        assert!(!cache.remove("code_generation").unwrap());
        assert!(matches!(cache.remove(GENERAL_DOMAIN), Err(Error::InvalidInput(_))));
        assert!(!cache.load(false).contains("code_generation"));
    }

    #[test]
    fn test_invalid_pattern_is_not_written() {
        let (store, cache) = cache();
        assert!(cache.upsert(Pattern::new("empty")).is_err());
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_store_failure_serves_defaults_uncached() {
        let store = Arc::new(DownStore {
            calls: AtomicUsize::new(0),
        });
        let cache = PatternCache::new(store.clone());

        let patterns = cache.load(false);
        assert_eq!(*patterns, default_patterns());
        assert!(!cache.is_warm());

        cache.load(false);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);

        assert!(cache.upsert(Pattern::new("x").with_keywords(["x"])).is_err());
    }

    #[test]
    fn test_missing_general_is_appended() {
        let store = Arc::new(InMemoryPatternStore::new(PatternSet::from_patterns([
            Pattern::new("only").with_keywords(["only"]),
        ])));
        let cache = PatternCache::new(store);
        let patterns = cache.load(false);
        assert_eq!(patterns.domains(), vec!["only", GENERAL_DOMAIN]);
    }
}
