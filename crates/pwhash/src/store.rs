use crate::handle::Handle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Concurrent, append-only table of finished digests.
///
/// An entry is either absent or holds its final encoded digest. Once written,
/// an entry is never replaced or removed, so a reader that observes a value
/// always observes the complete one published by the writer.
#[derive(Debug, Default)]
pub struct DigestStore {
    entries: RwLock<HashMap<Handle, String>>,
}

impl DigestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the digest for `handle`.
    ///
    /// Returns `false` and leaves the existing value untouched if the handle
    /// already has a digest.
    pub fn insert(&self, handle: Handle, digest: String) -> bool {
        match self.entries.write().entry(handle) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(digest);
                true
            }
        }
    }

    /// Returns the digest for `handle`, or `None` if it is not computed yet or
    /// the handle was never issued.
    pub fn get(&self, handle: Handle) -> Option<String> {
        self.entries.read().get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
