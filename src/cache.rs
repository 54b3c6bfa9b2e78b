// =============================================================================
// Transposition cache
//
// Maps a search key (position identity plus everything else that decides the
// subtree below it) to the number of turns found under that key. Two tiers:
//
//   - main: key -> item, split across shards so writers on different keys do
//     not contend.
//   - index: key prefix -> partition of items. A hit here avoids touching the
//     main tier. Partitions share the same `Arc<CacheItem>` as the main tier.
//
// Reads take shared locks and writes insert-if-absent, so concurrent writers
// of the same key agree on one stored value. Access counts are atomics bumped
// under a read lock.
// =============================================================================

use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const SHARDS: usize = 64;

/// Default number of leading key characters used to pick an index partition.
pub const DEFAULT_PARTITION_LEN: usize = 8;

#[derive(Debug)]
pub struct CacheItem {
    value: u64,
    access_count: AtomicU64,
}

impl CacheItem {
    pub fn new(value: u64) -> Self {
        CacheItem::with_access_count(value, 1)
    }

    fn with_access_count(value: u64, access_count: u64) -> Self {
        CacheItem { value, access_count: AtomicU64::new(access_count) }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of one cached entry, as exported by [`TranspositionCache::top_n`]
/// and the JSON snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: u64,
    pub access_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub partition_len: usize,
    pub entries: Vec<CacheEntry>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub index_misses: u64,
    pub main_hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub partitions: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.misses as f64 / self.lookups as f64
        }
    }
}

type Partition = Arc<RwLock<FxHashMap<String, Arc<CacheItem>>>>;

/// String-keyed map split over `SHARDS` locks.
struct Sharded<V> {
    shards: Vec<RwLock<FxHashMap<String, V>>>,
}

impl<V: Clone> Sharded<V> {
    fn new() -> Self {
        Sharded { shards: (0..SHARDS).map(|_| RwLock::new(FxHashMap::default())).collect() }
    }

    fn shard(&self, key: &str) -> &RwLock<FxHashMap<String, V>> {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }

    fn get(&self, key: &str) -> Option<V> {
        read(self.shard(key)).get(key).cloned()
    }

    /// Existing value for `key`, or the one built by `make` when absent.
    fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> V) -> V {
        if let Some(found) = self.get(key) {
            return found;
        }
        write(self.shard(key)).entry(key.to_string()).or_insert_with(make).clone()
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| read(s).len()).sum()
    }

    fn values(&self) -> Vec<(String, V)> {
        self.shards
            .iter()
            .flat_map(|s| read(s).iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>())
            .collect()
    }

    fn clear(&self) {
        for shard in &self.shards {
            write(shard).clear();
        }
    }
}

// A panic in another worker leaves the maps intact; keep using them.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct TranspositionCache {
    main: Sharded<Arc<CacheItem>>,
    index: Sharded<Partition>,
    partition_len: usize,
    lookups: AtomicU64,
    hits: AtomicU64,
    index_misses: AtomicU64,
    main_hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TranspositionCache {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_LEN)
    }
}

impl TranspositionCache {
    pub fn new(partition_len: usize) -> Self {
        TranspositionCache {
            main: Sharded::new(),
            index: Sharded::new(),
            partition_len: partition_len.max(1),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            index_misses: AtomicU64::new(0),
            main_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn partition_len(&self) -> usize {
        self.partition_len
    }

    fn prefix<'k>(&self, key: &'k str) -> &'k str {
        key.get(..self.partition_len).unwrap_or(key)
    }

    /// Look `key` up, index tier first. A hit bumps the entry's access count.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(partition) = self.index.get(self.prefix(key)) {
            let found = read(&partition).get(key).cloned();
            if let Some(item) = found {
                item.touch();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(item.value());
            }
        }
        self.index_misses.fetch_add(1, Ordering::Relaxed);

        match self.main.get(key) {
            Some(item) => {
                item.touch();
                self.main_hits.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(item.value())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` under `key` unless the key is already present, and
    /// return the value the cache holds afterwards.
    pub fn insert(&self, key: &str, value: u64) -> u64 {
        self.insert_item(key, CacheItem::new(value))
    }

    fn insert_item(&self, key: &str, item: CacheItem) -> u64 {
        let stored = self.main.get_or_insert_with(key, || Arc::new(item));
        let partition = self
            .index
            .get_or_insert_with(self.prefix(key), || Arc::new(RwLock::new(FxHashMap::default())));
        write(&partition).entry(key.to_string()).or_insert_with(|| Arc::clone(&stored));
        stored.value()
    }

    /// Access count of `key` without counting this as an access.
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.main.get(key).map(|item| item.access_count())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.main.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.main.clear();
        self.index.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            index_misses: self.index_misses.load(Ordering::Relaxed),
            main_hits: self.main_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.main.len(),
            partitions: self.index.len(),
        }
    }

    fn entries(&self) -> Vec<CacheEntry> {
        self.main
            .values()
            .into_iter()
            .map(|(key, item)| CacheEntry { key, value: item.value(), access_count: item.access_count() })
            .collect()
    }

    /// The `n` most accessed entries, ties broken by key.
    pub fn top_n(&self, n: usize) -> Vec<CacheEntry> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.access_count.cmp(&a.access_count).then_with(|| a.key.cmp(&b.key)));
        entries.truncate(n);
        entries
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let mut entries = self.entries();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheSnapshot { partition_len: self.partition_len, entries }
    }

    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let cache = TranspositionCache::new(snapshot.partition_len);
        for entry in snapshot.entries {
            cache.insert_item(&entry.key, CacheItem::with_access_count(entry.value, entry.access_count));
        }
        cache
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        info!("saved {} cache entries to {}", snapshot.entries.len(), path.display());
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: CacheSnapshot = serde_json::from_reader(reader)?;
        debug!("loading {} cache entries from {}", snapshot.entries.len(), path.display());
        Ok(TranspositionCache::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn miss_then_hit() {
        let cache = TranspositionCache::new(4);
        assert_eq!(cache.get("abcdef"), None);
        assert_eq!(cache.insert("abcdef", 42), 42);
        assert_eq!(cache.get("abcdef"), Some(42));
        assert_eq!(cache.access_count("abcdef"), Some(2));

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.partitions, 1);
    }

    #[test]
    fn first_insert_wins() {
        let cache = TranspositionCache::default();
        assert_eq!(cache.insert("key", 1), 1);
        assert_eq!(cache.insert("key", 2), 1);
        assert_eq!(cache.get("key"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_sharing_a_prefix_share_a_partition() {
        let cache = TranspositionCache::new(3);
        cache.insert("abc1", 1);
        cache.insert("abc2", 2);
        cache.insert("xy", 3);
        assert_eq!(cache.stats().partitions, 2);
        assert_eq!(cache.get("abc2"), Some(2));
        assert_eq!(cache.get("xy"), Some(3));
        assert_eq!(cache.stats().index_misses, 0);
    }

    #[test]
    fn concurrent_writers_agree() {
        let cache = TranspositionCache::default();
        thread::scope(|scope| {
            for worker in 0..8u64 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200u64 {
                        cache.insert(&format!("position-{i}"), i * 10);
                        cache.get(&format!("position-{}", (i + worker) % 200));
                    }
                });
            }
        });
        assert_eq!(cache.len(), 200);
        for i in 0..200u64 {
            assert_eq!(cache.get(&format!("position-{i}")), Some(i * 10));
        }
    }

    #[test]
    fn top_n_orders_by_access_count() {
        let cache = TranspositionCache::default();
        cache.insert("cold", 1);
        cache.insert("warm", 2);
        cache.insert("hot", 3);
        cache.get("hot");
        cache.get("hot");
        cache.get("warm");
        let top: Vec<String> = cache.top_n(2).into_iter().map(|e| e.key).collect();
        assert_eq!(top, vec!["hot", "warm"]);
    }

    #[test]
    fn snapshot_keeps_values_and_counts() {
        let cache = TranspositionCache::new(5);
        cache.insert("alpha", 7);
        cache.get("alpha");
        let restored = TranspositionCache::from_snapshot(cache.snapshot());
        assert_eq!(restored.partition_len(), 5);
        assert_eq!(restored.access_count("alpha"), Some(2));
        assert_eq!(restored.get("alpha"), Some(7));

        let path = std::env::temp_dir().join(format!("chess-explorer-cache-{}.json", std::process::id()));
        cache.save_json(&path).unwrap();
        let loaded = TranspositionCache::load_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.snapshot().entries, cache.snapshot().entries);
    }
}
