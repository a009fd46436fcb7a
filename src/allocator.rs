//! The allocator trait seam
//!
//! Generic callers (tests, benchmarks, embedding code) program against this
//! trait instead of a concrete pool type, so a pool can be swapped for any
//! other allocator honoring the same contract.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::PoolResult;
use crate::pool::PoolAllocator;
use crate::sync::LockedPool;

/// Allocation contract shared by the pool types in this crate.
///
/// # Safety
///
/// Implementors must hand out pointers that are valid, properly aligned for
/// the requested layout, and non-overlapping with every other live
/// allocation, and must keep them valid until deallocated.
pub unsafe trait Allocator {
    /// Allocate memory for `layout`.
    ///
    /// # Safety
    ///
    /// The returned pointer must be deallocated with the same allocator and
    /// a matching layout, and must not be used afterwards.
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>>;

    /// Deallocate a previously allocated pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been allocated by this allocator with `layout`
    /// - Must not be called more than once for the same pointer
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Reallocate memory, moving it if necessary.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been allocated with `old_layout`
    /// - On success `ptr` is invalid; use the returned pointer instead
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> PoolResult<NonNull<[u8]>>;
}

// SAFETY: PoolAllocator's inherent methods uphold the trait contract: blocks
// are carved from a region it exclusively owns and never overlap.
unsafe impl Allocator for PoolAllocator {
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { PoolAllocator::allocate(self, layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { PoolAllocator::deallocate(self, ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { PoolAllocator::reallocate(self, ptr, old_layout, new_layout) }
    }
}

// SAFETY: LockedPool serializes every call through its mutex before
// delegating to an inner PoolAllocator.
unsafe impl Allocator for LockedPool {
    unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { LockedPool::allocate(self, layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { LockedPool::deallocate(self, ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> PoolResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { LockedPool::reallocate(self, ptr, old_layout, new_layout) }
    }
}
