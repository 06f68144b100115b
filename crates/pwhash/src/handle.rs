use portable_atomic::{AtomicU64, Ordering};

/// Opaque identifier returned by a submission.
pub type Handle = u64;

/// Lock-free source of unique, strictly increasing [`Handle`]s.
///
/// The first handle issued is `1`. Handles are never reused for the lifetime
/// of the allocator.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    last: AtomicU64,
}

impl HandleAllocator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Issues the next handle.
    ///
    /// Only uniqueness matters across threads, so a relaxed increment is
    /// sufficient.
    pub fn next(&self) -> Handle {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued handle, or `0` if none was issued yet.
    pub fn last(&self) -> Handle {
        self.last.load(Ordering::Relaxed)
    }
}
