use dashmap::DashMap;
use parking_lot::{FairMutex, FairMutexGuard};
use std::sync::Arc;

/// A handle to a per-collection mutex that can be stored and reused.
pub struct LockHandle {
    lock: Arc<FairMutex<()>>,
}

impl LockHandle {
    /// Acquires the lock for the duration of the returned guard.
    pub fn lock(&self) -> FairMutexGuard<'_, ()> {
        self.lock.lock()
    }
}

/// Registry of named serialization locks, one per collection.
///
/// Mutation operations acquire the collection's lock for their entire
/// duration so metadata read-modify-write never races; read operations do not
/// take the lock and tolerate intermediate metadata states.
///
/// Fair mutexes hand the lock to waiters in arrival order, giving the FIFO
/// serialization the store relies on. Locks are created lazily on first use
/// and never removed.
///
/// # Examples
///
/// ```
/// use plugport::common::LockRegistry;
/// let registry = LockRegistry::new();
/// let handle = registry.get_lock("users");
/// {
///     let _guard = handle.lock();
/// } // lock is held while _guard is in scope
/// ```
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<String, Arc<FairMutex<()>>>>,
}

impl LockRegistry {
    /// Creates a new empty lock registry.
    pub fn new() -> Self {
        LockRegistry {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Gets the lock for the given collection, creating it if absent.
    pub fn get_lock(&self, name: &str) -> LockHandle {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(FairMutex::new(())))
            .clone();
        LockHandle { lock }
    }

    /// Returns the number of locks currently registered.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
