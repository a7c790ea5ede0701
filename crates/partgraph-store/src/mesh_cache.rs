//! Bounded mesh cache with least-recently-used eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use partgraph_adjacency::PartId;
use partgraph_bbox::Mesh;

#[derive(Debug)]
struct CacheEntry {
    mesh: Arc<Mesh>,
    /// Access tick of the last hit or insert
    last_access: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to load.
    pub misses: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PartId, CacheEntry>,
    tick: u64,
    stats: CacheStats,
}

impl Inner {
    fn evict_lru(&mut self) {
        let lru = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(&key, _)| key);
        if let Some(key) = lru {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}

/// Thread-safe mesh cache holding at most `capacity` meshes.
///
/// A capacity of zero disables caching.
#[derive(Debug)]
pub struct MeshCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MeshCache {
    /// Create a cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
        }
    }

    /// Maximum number of cached meshes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of cached meshes.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Cached mesh, if present. Counts as an access.
    pub fn get(&self, part: PartId) -> Option<Arc<Mesh>> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tick += 1;
        let tick = inner.tick;
        match inner.entries.get_mut(&part) {
            Some(entry) => {
                entry.last_access = tick;
                let mesh = Arc::clone(&entry.mesh);
                inner.stats.hits += 1;
                Some(mesh)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a mesh, evicting least recently used entries as needed.
    pub fn insert(&self, part: PartId, mesh: Arc<Mesh>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();
        if !inner.entries.contains_key(&part) {
            while inner.entries.len() >= self.capacity {
                inner.evict_lru();
            }
        }
        inner.tick += 1;
        let last_access = inner.tick;
        inner.entries.insert(part, CacheEntry { mesh, last_access });
    }

    /// Cached mesh, or the result of `load` which is then cached.
    ///
    /// The lock is not held while loading; two threads missing the same key
    /// may both load it.
    pub fn get_or_try_insert_with<E>(
        &self,
        part: PartId,
        load: impl FnOnce() -> Result<Mesh, E>,
    ) -> Result<Arc<Mesh>, E> {
        if let Some(mesh) = self.get(part) {
            return Ok(mesh);
        }
        let mesh = Arc::new(load()?);
        self.insert(part, Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Drop every cached mesh.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partgraph_math::{Point3, Vec3};

    fn mesh(size: f64) -> Mesh {
        Mesh::cuboid(Point3::origin(), Vec3::new(size, size, size))
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = MeshCache::new(2);
        cache.insert(1, Arc::new(mesh(1.0)));
        cache.insert(2, Arc::new(mesh(2.0)));
        assert!(cache.get(1).is_some());
        cache.insert(3, Arc::new(mesh(3.0)));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_or_try_insert_with_loads_once() {
        let cache = MeshCache::new(4);
        let mut loads = 0;
        for _ in 0..3 {
            let m = cache
                .get_or_try_insert_with(7, || {
                    loads += 1;
                    Ok::<_, String>(mesh(1.0))
                })
                .unwrap();
            assert_eq!(m.vertex_count(), 8);
        }
        assert_eq!(loads, 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_error_is_not_cached() {
        let cache = MeshCache::new(4);
        let err = cache.get_or_try_insert_with(1, || Err::<Mesh, _>("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = MeshCache::new(0);
        cache.insert(1, Arc::new(mesh(1.0)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let cache = MeshCache::new(2);
        cache.insert(1, Arc::new(mesh(1.0)));
        cache.insert(2, Arc::new(mesh(2.0)));
        cache.insert(2, Arc::new(mesh(4.0)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }
}
