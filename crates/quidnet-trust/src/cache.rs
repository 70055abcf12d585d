//! TTL cache for trust computations.
//!
//! Coarse coherence policy: any write to the trust registry purges the
//! whole cache (both sub-caches). Entries are lazily created on compute
//! and lazily expired on lookup. Stored and returned values are owned
//! copies, so callers can never mutate cache state through a result.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use quidnet_core::QuidId;

use crate::enhanced::EnhancedTrustResult;
use crate::graph::TrustResult;

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

/// Process-wide trust cache with an enhanced sub-cache.
pub struct TrustCache {
    ttl: Duration,
    plain: Mutex<HashMap<String, Entry<TrustResult>>>,
    enhanced: Mutex<HashMap<String, Entry<EnhancedTrustResult>>>,
}

impl TrustCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            plain: Mutex::new(HashMap::new()),
            enhanced: Mutex::new(HashMap::new()),
        }
    }

    pub fn plain_key(observer: &QuidId, target: &QuidId, depth: usize) -> String {
        format!("{observer}:{target}:{depth}")
    }

    pub fn enhanced_key(
        observer: &QuidId,
        target: &QuidId,
        depth: usize,
        include_unverified: bool,
    ) -> String {
        format!("{observer}:{target}:{depth}:{include_unverified}")
    }

    pub fn get(&self, key: &str) -> Option<TrustResult> {
        let mut map = self.plain.lock().expect("trust cache lock poisoned");
        Self::lookup(&mut map, key, self.ttl)
    }

    pub fn put(&self, key: String, value: TrustResult) {
        let mut map = self.plain.lock().expect("trust cache lock poisoned");
        map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get_enhanced(&self, key: &str) -> Option<EnhancedTrustResult> {
        let mut map = self.enhanced.lock().expect("trust cache lock poisoned");
        Self::lookup(&mut map, key, self.ttl)
    }

    pub fn put_enhanced(&self, key: String, value: EnhancedTrustResult) {
        let mut map = self.enhanced.lock().expect("trust cache lock poisoned");
        map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry in both sub-caches. Called on any trust registry
    /// mutation.
    pub fn purge(&self) {
        self.plain
            .lock()
            .expect("trust cache lock poisoned")
            .clear();
        self.enhanced
            .lock()
            .expect("trust cache lock poisoned")
            .clear();
    }

    fn lookup<T: Clone>(
        map: &mut HashMap<String, Entry<T>>,
        key: &str,
        ttl: Duration,
    ) -> Option<T> {
        match map.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < ttl => Some(entry.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> QuidId {
        QuidId::new(s)
    }

    fn result(level: f64, path: &[&str]) -> TrustResult {
        TrustResult {
            level,
            path: path.iter().map(|s| q(s)).collect(),
            graph_too_large: false,
        }
    }

    #[test]
    fn hit_returns_the_stored_result() {
        let cache = TrustCache::new(Duration::from_secs(60));
        let key = TrustCache::plain_key(&q("a"), &q("c"), 5);
        cache.put(key.clone(), result(0.4, &["a", "b", "c"]));
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.level, 0.4);
        assert_eq!(hit.path.len(), 3);
    }

    #[test]
    fn returned_paths_are_copies() {
        let cache = TrustCache::new(Duration::from_secs(60));
        let key = TrustCache::plain_key(&q("a"), &q("c"), 5);
        cache.put(key.clone(), result(0.4, &["a", "b", "c"]));

        let mut first = cache.get(&key).unwrap();
        first.path.clear();
        first.level = 0.0;

        let second = cache.get(&key).unwrap();
        assert_eq!(second.path.len(), 3);
        assert_eq!(second.level, 0.4);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TrustCache::new(Duration::from_millis(20));
        let key = TrustCache::plain_key(&q("a"), &q("b"), 5);
        cache.put(key.clone(), result(0.8, &["a", "b"]));
        assert!(cache.get(&key).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn purge_clears_both_sub_caches() {
        let cache = TrustCache::new(Duration::from_secs(60));
        let key = TrustCache::plain_key(&q("a"), &q("b"), 5);
        cache.put(key.clone(), result(0.8, &["a", "b"]));
        let ekey = TrustCache::enhanced_key(&q("a"), &q("b"), 5, true);
        cache.put_enhanced(
            ekey.clone(),
            EnhancedTrustResult {
                level: 0.8,
                path: vec![q("a"), q("b")],
                unverified_hops: 0,
                verification_gaps: vec![],
                confidence: crate::Confidence::High,
                graph_too_large: false,
            },
        );
        cache.purge();
        assert!(cache.get(&key).is_none());
        assert!(cache.get_enhanced(&ekey).is_none());
    }

    #[test]
    fn keys_distinguish_depth_and_layer() {
        assert_ne!(
            TrustCache::plain_key(&q("a"), &q("b"), 5),
            TrustCache::plain_key(&q("a"), &q("b"), 3)
        );
        assert_ne!(
            TrustCache::enhanced_key(&q("a"), &q("b"), 5, true),
            TrustCache::enhanced_key(&q("a"), &q("b"), 5, false)
        );
    }
}
