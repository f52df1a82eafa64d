pub mod memory;

pub use memory::InMemoryKv;

use crate::errors::PlugPortResult;
use std::sync::Arc;

/// A key-value entry returned by scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Options for a bounded range scan.
///
/// `prefix` restricts results to keys starting with the prefix. `start_key`
/// is inclusive, `end_key` exclusive; both compose with `prefix` (the
/// narrower bound wins). Results are ascending unless `reverse` is set, and
/// never exceed `limit` when one is given.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub prefix: Option<Vec<u8>>,
    pub start_key: Option<Vec<u8>>,
    pub end_key: Option<Vec<u8>>,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl ScanOptions {
    /// Scan every key under a prefix.
    pub fn with_prefix(prefix: Vec<u8>) -> Self {
        ScanOptions {
            prefix: Some(prefix),
            ..Default::default()
        }
    }

    /// Scan the half-open range `[start, end)`.
    pub fn with_range(start: Vec<u8>, end: Vec<u8>) -> Self {
        ScanOptions {
            start_key: Some(start),
            end_key: Some(end),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Low-level interface to the ordered key-value substrate.
///
/// # Purpose
/// Defines the contract all storage backends present to the document store.
/// Keys are byte strings ordered lexicographically; values are opaque byte
/// strings. Every call is point-in-time: there are no long-lived cursors, and
/// scans are always bounded by an explicit row limit at the call sites.
///
/// # Thread safety
/// Implementers must be `Send + Sync`; the store shares one backend across
/// all collections and request threads.
pub trait KvStore: Send + Sync {
    /// Retrieves the value associated with a key.
    fn get(&self, key: &[u8]) -> PlugPortResult<Option<Vec<u8>>>;

    /// Inserts or replaces a key-value pair.
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> PlugPortResult<()>;

    /// Removes a key, returning whether it existed.
    fn delete(&self, key: &[u8]) -> PlugPortResult<bool>;

    /// Checks whether a key exists.
    fn has(&self, key: &[u8]) -> PlugPortResult<bool>;

    /// Returns entries in the requested range, ordered ascending (or
    /// descending with `reverse`), up to `limit`.
    fn scan(&self, options: ScanOptions) -> PlugPortResult<Vec<KvEntry>>;

    /// Returns the number of keys starting with the prefix, or the total
    /// number of keys when no prefix is given.
    fn count(&self, prefix: Option<&[u8]>) -> PlugPortResult<u64>;

    /// Removes everything. Used only by tests and teardown.
    fn clear(&self) -> PlugPortResult<()>;

    /// Whether [`KvStore::batch_write`] applies atomically. When true, the
    /// store routes multi-key mutations through a single batch.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Applies all puts and deletes as one batch.
    ///
    /// # Default Implementation
    /// Falls back to individual operations with no atomicity. Backends that
    /// can do better should override this and report it via
    /// [`KvStore::supports_batch`].
    fn batch_write(
        &self,
        puts: Vec<(Vec<u8>, Vec<u8>)>,
        deletes: Vec<Vec<u8>>,
    ) -> PlugPortResult<()> {
        for (key, value) in puts {
            self.put(key, value)?;
        }
        for key in deletes {
            self.delete(&key)?;
        }
        Ok(())
    }
}

/// Shared handle to a KV backend.
pub type KvStoreRef = Arc<dyn KvStore>;

/// Computes the smallest key strictly greater than every key with the given
/// prefix, for use as an exclusive scan bound. Returns `None` when no such
/// key exists (prefix is empty or all `0xFF`).
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last() {
        if *last == 0xFF {
            end.pop();
        } else {
            *end.last_mut().unwrap() += 1;
            return Some(end);
        }
    }
    None
}
