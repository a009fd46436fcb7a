//! Thread-safe pool wrapper
//!
//! The allocator itself is a single-threaded structure: header mutation
//! (splitting, list splicing, coalescing) touches shared state that cannot be
//! partitioned without a per-size-class redesign. The supported way to share
//! a pool across threads is therefore exactly one lock guarding the whole
//! pool, which this wrapper provides using `parking_lot`.

use core::alloc::Layout;
use core::ptr::NonNull;

use parking_lot::Mutex;

use crate::error::PoolResult;
use crate::pool::{PoolAllocator, PoolConfig};
use crate::stats::PoolStats;

/// A [`PoolAllocator`] behind a [`parking_lot::Mutex`].
///
/// Every operation takes the lock for its full duration; all calls are
/// bounded, synchronous computations, so the lock is never held across a
/// suspension point.
pub struct LockedPool {
    inner: Mutex<PoolAllocator>,
}

impl LockedPool {
    /// Create a locked pool with crate-owned backing storage.
    pub fn new(capacity: usize) -> PoolResult<Self> {
        Ok(Self::from_pool(PoolAllocator::new(capacity)?))
    }

    /// Create a locked pool with explicit configuration.
    pub fn with_config(capacity: usize, config: PoolConfig) -> PoolResult<Self> {
        Ok(Self::from_pool(PoolAllocator::with_config(
            capacity, config,
        )?))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PoolAllocator) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Allocate memory for `layout` under the pool lock.
    ///
    /// # Safety
    ///
    /// Same contract as [`PoolAllocator::allocate`].
    pub unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract; the lock serializes mutation.
        unsafe { self.inner.lock().allocate(layout) }
    }

    /// Deallocate under the pool lock.
    ///
    /// # Safety
    ///
    /// Same contract as [`PoolAllocator::deallocate`].
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract; the lock serializes mutation.
        unsafe { self.inner.lock().deallocate(ptr, layout) }
    }

    /// Reallocate under the pool lock.
    ///
    /// # Safety
    ///
    /// Same contract as [`PoolAllocator::reallocate`].
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract; the lock serializes mutation.
        unsafe { self.inner.lock().reallocate(ptr, old_layout, new_layout) }
    }

    /// Run the exhaustive coalescing pass under the lock.
    pub fn coalesce(&self) {
        self.inner.lock().coalesce();
    }

    /// Snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the inner pool, for diagnostics that
    /// need more than one consistent reading.
    pub fn with<R>(&self, f: impl FnOnce(&PoolAllocator) -> R) -> R {
        f(&self.inner.lock())
    }
}

impl core::fmt::Debug for LockedPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockedPool")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_pool_is_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LockedPool>();
        assert_sync::<LockedPool>();
    }

    #[test]
    fn test_concurrent_alloc_free() {
        let pool = std::sync::Arc::new(LockedPool::new(1 << 20).unwrap());
        let layout = Layout::from_size_align(64, 8).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = std::sync::Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        unsafe {
                            let ptr = pool.allocate(layout).unwrap();
                            pool.deallocate(ptr.cast(), layout);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.used_blocks, 0);
        assert_eq!(stats.free_bytes, stats.capacity);
    }
}
