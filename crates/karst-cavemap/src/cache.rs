//! Set-associative fragment cache.
//!
//! Fragments are expensive to generate and heavily reused across chunk
//! queries, so they are cached in 256 sets of 8 slots with LRU order inside
//! each set. Each set has its own mutex; production runs outside every lock
//! so one slow generator chain never serializes unrelated lookups. Two
//! racing producers for the same position are resolved by re-checking under
//! the lock — the loser's fragment is dropped before anyone can observe it.
//!
//! The cache holds one `Arc` per slot; eviction just drops that `Arc`, so a
//! fragment still referenced by live views survives until the last view
//! releases it.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHasher;

use crate::fragment::{BiomeFragment, FragmentPosition};
use crate::generator::GeneratorError;

/// Number of cache sets; must stay a power of two for mask indexing.
pub const CACHE_SETS: usize = 256;
/// Slots per set.
pub const CACHE_WAYS: usize = 8;

/// Bounded cache of generated fragments, keyed by [`FragmentPosition`].
pub struct FragmentCache {
    sets: Vec<Mutex<Vec<Arc<BiomeFragment>>>>,
}

impl FragmentCache {
    pub fn new() -> Self {
        Self {
            sets: (0..CACHE_SETS)
                .map(|_| Mutex::new(Vec::with_capacity(CACHE_WAYS)))
                .collect(),
        }
    }

    fn set_index(pos: &FragmentPosition) -> usize {
        let mut hasher = FxHasher::default();
        pos.hash(&mut hasher);
        hasher.finish() as usize & (CACHE_SETS - 1)
    }

    /// Look up a fragment, generating it through `produce` on a miss.
    ///
    /// Hits are promoted to most-recently-used within their set. `produce`
    /// runs without holding any lock; when it loses a race against another
    /// producer for the same position, its result is discarded and the
    /// winner's fragment is returned, so all callers observe one fragment
    /// per position. A full set evicts its least-recently-used slot.
    ///
    /// On a `produce` error nothing is inserted.
    pub fn find_or_create<F>(
        &self,
        pos: FragmentPosition,
        produce: F,
    ) -> Result<Arc<BiomeFragment>, GeneratorError>
    where
        F: FnOnce(FragmentPosition) -> Result<Arc<BiomeFragment>, GeneratorError>,
    {
        let set = &self.sets[Self::set_index(&pos)];
        if let Some(hit) = Self::promote(&mut set.lock().unwrap(), pos) {
            return Ok(hit);
        }

        let fresh = produce(pos)?;

        let mut slots = set.lock().unwrap();
        if let Some(winner) = Self::promote(&mut slots, pos) {
            // A racing producer inserted first; drop the fresh fragment.
            return Ok(winner);
        }
        if slots.len() == CACHE_WAYS {
            let evicted = slots.pop().unwrap();
            tracing::trace!(?pos, evicted = ?evicted.position(), "evicting LRU fragment");
        }
        slots.insert(0, Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Move the slot for `pos` to the MRU position and return it.
    fn promote(
        slots: &mut Vec<Arc<BiomeFragment>>,
        pos: FragmentPosition,
    ) -> Option<Arc<BiomeFragment>> {
        let index = slots.iter().position(|f| f.position() == pos)?;
        let hit = slots.remove(index);
        slots.insert(0, Arc::clone(&hit));
        Some(hit)
    }

    /// Drops every cached fragment. Fragments still referenced by live
    /// views are destroyed when those views end.
    pub fn clear(&self) {
        for set in &self.sets {
            set.lock().unwrap().clear();
        }
    }

    /// Number of fragments currently cached.
    pub fn len(&self) -> usize {
        self.sets.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FragmentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use karst_math::FRAGMENT_SIZE;
    use karst_terrain::BiomeId;
    use std::sync::Weak;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pos(i: i32) -> FragmentPosition {
        FragmentPosition {
            coords: IVec3::new(i * FRAGMENT_SIZE, 0, 0),
            voxel_size: 1,
        }
    }

    fn blank(pos: FragmentPosition) -> Result<Arc<BiomeFragment>, GeneratorError> {
        Ok(Arc::new(BiomeFragment::new(pos, BiomeId(0))))
    }

    /// Positions that all land in the same cache set.
    fn colliding_positions(count: usize) -> Vec<FragmentPosition> {
        let target = FragmentCache::set_index(&pos(0));
        let mut found = vec![pos(0)];
        let mut i = 1;
        while found.len() < count {
            let candidate = pos(i);
            if FragmentCache::set_index(&candidate) == target {
                found.push(candidate);
            }
            i += 1;
        }
        found
    }

    #[test]
    fn test_hit_returns_shared_fragment() {
        let cache = FragmentCache::new();
        let a = cache.find_or_create(pos(1), blank).unwrap();
        let b = cache
            .find_or_create(pos(1), |_| panic!("hit must not produce"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_positions_distinct_fragments() {
        let cache = FragmentCache::new();
        let a = cache.find_or_create(pos(1), blank).unwrap();
        let b = cache.find_or_create(pos(2), blank).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_full_set_evicts_lru() {
        let cache = FragmentCache::new();
        let positions = colliding_positions(CACHE_WAYS + 1);
        let first = cache.find_or_create(positions[0], blank).unwrap();
        let weak_first = Arc::downgrade(&first);
        drop(first);

        for p in &positions[1..=CACHE_WAYS - 1] {
            cache.find_or_create(*p, blank).unwrap();
        }
        // Touch the oldest entry so it is MRU, then overflow the set.
        cache
            .find_or_create(positions[0], |_| panic!("should hit"))
            .unwrap();
        cache.find_or_create(positions[CACHE_WAYS], blank).unwrap();

        assert_eq!(cache.len(), CACHE_WAYS, "set stays at capacity");
        assert!(
            weak_first.upgrade().is_some(),
            "recently-used entry must survive eviction"
        );
        // The second-inserted position was LRU and must be gone: a lookup
        // produces a new fragment.
        let produced = AtomicUsize::new(0);
        cache
            .find_or_create(positions[1], |p| {
                produced.fetch_add(1, Ordering::Relaxed);
                blank(p)
            })
            .unwrap();
        assert_eq!(produced.load(Ordering::Relaxed), 1, "LRU entry was evicted");
    }

    #[test]
    fn test_eviction_does_not_free_outside_references() {
        let cache = FragmentCache::new();
        let positions = colliding_positions(CACHE_WAYS + 1);
        let held = cache.find_or_create(positions[0], blank).unwrap();
        for p in &positions[1..] {
            cache.find_or_create(*p, blank).unwrap();
        }
        // positions[0] has been evicted, but our Arc keeps it alive.
        assert_eq!(held.position(), positions[0]);
    }

    #[test]
    fn test_clear_releases_everything() {
        let cache = FragmentCache::new();
        let weaks: Vec<Weak<BiomeFragment>> = (0..32)
            .map(|i| Arc::downgrade(&cache.find_or_create(pos(i), blank).unwrap()))
            .collect();
        cache.clear();
        assert!(cache.is_empty());
        assert!(
            weaks.iter().all(|w| w.upgrade().is_none()),
            "cleared fragments must be destroyed"
        );
    }

    #[test]
    fn test_producer_error_caches_nothing() {
        let cache = FragmentCache::new();
        let err = cache.find_or_create(pos(3), |_| {
            Err(GeneratorError::Failed {
                id: "test".to_string(),
                reason: "boom".to_string(),
            })
        });
        assert!(err.is_err());
        assert!(cache.is_empty());
        // A later attempt succeeds normally.
        assert!(cache.find_or_create(pos(3), blank).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_same_position_single_entry() {
        let cache = FragmentCache::new();
        let target = pos(7);
        let results: Vec<Arc<BiomeFragment>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = &cache;
                    scope.spawn(move || cache.find_or_create(target, blank).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(cache.len(), 1, "exactly one entry per position");
        for r in &results[1..] {
            assert!(
                Arc::ptr_eq(&results[0], r),
                "all callers must observe the same fragment"
            );
        }
    }
}
