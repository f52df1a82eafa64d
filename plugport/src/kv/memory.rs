use crate::errors::PlugPortResult;
use crate::kv::{prefix_successor, KvEntry, KvStore, ScanOptions};
use crossbeam_skiplist::SkipMap;
use parking_lot::Mutex;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;

/// In-memory ordered key-value backend over a concurrent skip list.
///
/// # Purpose
/// The default substrate for embedded use and the backend all tests run
/// against. Keys order lexicographically as raw bytes, which is exactly the
/// order the key encoding layer is designed for.
///
/// # Characteristics
/// - **Thread-safe**: cheap clones share the same map
/// - **O(log n)** get/put/remove via the skip list
/// - **Range scans** with inclusive-start, exclusive-end bounds
/// - **Batched writes** serialized under a mutex so batches never interleave
#[derive(Clone)]
pub struct InMemoryKv {
    inner: Arc<InMemoryKvInner>,
}

impl InMemoryKv {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        InMemoryKv {
            inner: Arc::new(InMemoryKvInner::new()),
        }
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        InMemoryKv::new()
    }
}

struct InMemoryKvInner {
    map: SkipMap<Vec<u8>, Vec<u8>>,
    batch_lock: Mutex<()>,
}

impl InMemoryKvInner {
    fn new() -> Self {
        InMemoryKvInner {
            map: SkipMap::new(),
            batch_lock: Mutex::new(()),
        }
    }

    /// Resolves the effective `[start, end)` bounds from prefix and explicit
    /// range options; the narrower bound wins on each side.
    fn effective_bounds(options: &ScanOptions) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        let mut start = options.start_key.clone();
        let mut end = options.end_key.clone();

        if let Some(prefix) = &options.prefix {
            match &start {
                Some(s) if s >= prefix => {}
                _ => start = Some(prefix.clone()),
            }
            if let Some(successor) = prefix_successor(prefix) {
                match &end {
                    Some(e) if *e <= successor => {}
                    _ => end = Some(successor),
                }
            }
        }

        (start, end)
    }
}

impl KvStore for InMemoryKv {
    fn get(&self, key: &[u8]) -> PlugPortResult<Option<Vec<u8>>> {
        Ok(self.inner.map.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> PlugPortResult<()> {
        self.inner.map.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> PlugPortResult<bool> {
        Ok(self.inner.map.remove(key).is_some())
    }

    fn has(&self, key: &[u8]) -> PlugPortResult<bool> {
        Ok(self.inner.map.contains_key(key))
    }

    fn scan(&self, options: ScanOptions) -> PlugPortResult<Vec<KvEntry>> {
        let (start, end) = InMemoryKvInner::effective_bounds(&options);
        let lower = match &start {
            Some(key) => Included(key.clone()),
            None => Unbounded,
        };
        let upper = match &end {
            Some(key) => Excluded(key.clone()),
            None => Unbounded,
        };

        let limit = options.limit.unwrap_or(usize::MAX);
        let range = self.inner.map.range((lower, upper));

        let mut entries = Vec::new();
        if options.reverse {
            for entry in range.rev() {
                if entries.len() >= limit {
                    break;
                }
                entries.push(KvEntry {
                    key: entry.key().clone(),
                    value: entry.value().clone(),
                });
            }
        } else {
            for entry in range {
                if entries.len() >= limit {
                    break;
                }
                entries.push(KvEntry {
                    key: entry.key().clone(),
                    value: entry.value().clone(),
                });
            }
        }
        Ok(entries)
    }

    fn count(&self, prefix: Option<&[u8]>) -> PlugPortResult<u64> {
        match prefix {
            None => Ok(self.inner.map.len() as u64),
            Some(prefix) => {
                let entries = self.scan(ScanOptions::with_prefix(prefix.to_vec()))?;
                Ok(entries.len() as u64)
            }
        }
    }

    fn clear(&self) -> PlugPortResult<()> {
        self.inner.map.clear();
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        true
    }

    fn batch_write(
        &self,
        puts: Vec<(Vec<u8>, Vec<u8>)>,
        deletes: Vec<Vec<u8>>,
    ) -> PlugPortResult<()> {
        let _guard = self.inner.batch_lock.lock();
        for (key, value) in puts {
            self.inner.map.insert(key, value);
        }
        for key in deletes {
            self.inner.map.remove(&key);
        }
        Ok(())
    }
}
