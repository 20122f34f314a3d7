//! Identity-preserving handle registry.
//!
//! Transports hand out resources identified by a [`ResourceId`]. Wrapping the
//! same resource twice must yield the same high-level handle, otherwise
//! identity-based equality (and anything keyed on it) breaks across repeated
//! lookups. The registry keeps a weak reference per live handle and creates a
//! new one lazily when none is alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Identity of a transport-level resource.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ResourceId(pub u64);

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    /// Allocate a process-unique id.
    pub fn allocate() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Dead entries are swept after this many insertions.
const PURGE_INTERVAL: usize = 64;

/// Cache from resource identity to the single live handle for it.
pub struct HandleRegistry<T> {
    live: DashMap<ResourceId, Weak<T>>,
    inserts: AtomicUsize,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            live: DashMap::new(),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Return the live handle for `id`, creating it with `make` if there is
    /// none. `make` runs at most once per call and only when needed.
    pub fn get_or_insert_with(&self, id: ResourceId, make: impl FnOnce() -> T) -> Arc<T> {
        let handle = match self.live.entry(id) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade() {
                    return existing;
                }
                let handle = Arc::new(make());
                entry.insert(Arc::downgrade(&handle));
                handle
            }
            Entry::Vacant(entry) => {
                let handle = Arc::new(make());
                entry.insert(Arc::downgrade(&handle));
                handle
            }
        };

        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge();
        }
        handle
    }

    /// Live handle for `id`, if any.
    pub fn get(&self, id: ResourceId) -> Option<Arc<T>> {
        self.live.get(&id).and_then(|weak| weak.upgrade())
    }

    /// Drop entries whose handle is gone.
    pub fn purge(&self) {
        self.live.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of entries, live or not yet purged.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry").field("entries", &self.live.len()).finish()
    }
}
