//! Thread-shareable Bloom filter handle
//!
//! `BloomFilter` itself carries no synchronization. This wraps it in a
//! reader-writer lock: many concurrent `contains`, one `insert` at a time,
//! and no reader ever observes a half-applied insertion.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::BloomFilter;
use crate::error::FilterError;

/// Cloneable handle to one lock-guarded filter
///
/// Clones of the handle share the same filter. Use [`snapshot`] to get an
/// independent copy that can be handed to another owner.
///
/// [`snapshot`]: SharedBloomFilter::snapshot
#[derive(Clone, Debug)]
pub struct SharedBloomFilter {
    inner: Arc<RwLock<BloomFilter>>,
}

impl SharedBloomFilter {
    pub fn new(filter: BloomFilter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(filter)),
        }
    }

    /// Insert under the write lock
    pub fn insert(&self, element: &[u8]) {
        self.inner.write().insert(element);
    }

    /// Test membership under the read lock
    pub fn contains(&self, element: &[u8]) -> bool {
        self.inner.read().contains(element)
    }

    /// Merge a same-shape filter in under the write lock
    pub fn union_from(&self, other: &BloomFilter) -> Result<(), FilterError> {
        self.inner.write().union_with(other)
    }

    /// Independent copy of the current state
    pub fn snapshot(&self) -> BloomFilter {
        self.inner.read().clone()
    }

    /// Run `f` with shared access to the filter
    pub fn read<R>(&self, f: impl FnOnce(&BloomFilter) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }
}

impl From<BloomFilter> for SharedBloomFilter {
    fn from(filter: BloomFilter) -> Self {
        Self::new(filter)
    }
}
