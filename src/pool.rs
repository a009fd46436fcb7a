//! Fixed-pool allocator with a bump-frontier fast path
//!
//! [`PoolAllocator`] owns (or borrows) one contiguous region and serves every
//! allocation out of it. Allocation order of preference:
//!
//! 1. **Bump frontier** — an offset into the never-yet-carved tail of the
//!    pool. While untouched space remains, allocation is a single header
//!    write and an offset bump; no list is consulted.
//! 2. **Free list** — first fit by ascending address, splitting off any
//!    remainder worth keeping.
//! 3. **Exhaustive coalesce** — when the fit search misses, every contiguous
//!    run of free blocks is merged and the search retried exactly once. A
//!    second miss is a genuine out-of-memory result.
//!
//! Freeing marks the block, splices it into the address-ordered free list and
//! merges it with its immediate neighbors. The frontier never retreats; space
//! freed from the fast path is managed by the list like any other block.
//!
//! The allocator is a synchronous, single-threaded structure: it is `Send`
//! but deliberately not `Sync`. Share it across threads through
//! [`LockedPool`](crate::sync::LockedPool) or an external lock of your own.

use core::alloc::Layout;
use core::cell::UnsafeCell;
use core::ptr::{self, NonNull};
use std::alloc;

use crate::block::{self, BlockHeader, HEADER_SIZE};
use crate::core::types::{align_up, alignment::MIN_ALIGN};
use crate::error::{PoolError, PoolResult};
use crate::free_list::FreeList;
use crate::stats::{BlockInfo, FragmentationStats, PoolStats};

#[cfg(feature = "logging")]
use tracing::debug;

/// Smallest region that can hold a pool: one header plus one aligned payload.
pub const MIN_POOL_SIZE: usize = HEADER_SIZE + MIN_ALIGN;

/// Configuration for a pool allocator
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Fill pattern byte for newly allocated payloads (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for freed payloads (for debugging)
    pub dealloc_pattern: Option<u8>,
    /// Assert on teardown that every allocation was returned
    pub leak_check: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xBB)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
            leak_check: cfg!(debug_assertions),
        }
    }
}

impl PoolConfig {
    /// Production configuration - no fill patterns, no teardown checks
    #[must_use]
    pub fn production() -> Self {
        Self {
            alloc_pattern: None,
            dealloc_pattern: None,
            leak_check: false,
        }
    }

    /// Debug configuration - fill patterns and leak detection always on
    #[must_use]
    pub fn debug() -> Self {
        Self {
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
            leak_check: true,
        }
    }
}

/// Mutable bookkeeping, kept behind one cell so the public API can take
/// `&self` like the rest of the allocator family.
struct PoolState {
    /// Byte offset of the first never-carved byte. Only grows.
    frontier: usize,
    /// Address-ordered list of free blocks in the carved region.
    free: FreeList,
}

/// Fixed-capacity allocator over one contiguous memory region.
pub struct PoolAllocator {
    base: NonNull<u8>,
    capacity: usize,
    owned: bool,
    config: PoolConfig,
    state: UnsafeCell<PoolState>,
}

// SAFETY: the pool exclusively owns its region and all bookkeeping; moving it
// to another thread moves the whole structure. Interior mutability through
// `UnsafeCell` keeps it !Sync, which matches the single-mutator contract.
unsafe impl Send for PoolAllocator {}

impl PoolAllocator {
    /// Create a pool with crate-owned backing storage of `capacity` bytes.
    pub fn new(capacity: usize) -> PoolResult<Self> {
        Self::with_config(capacity, PoolConfig::default())
    }

    /// Create a pool with crate-owned backing storage and explicit config.
    pub fn with_config(capacity: usize, config: PoolConfig) -> PoolResult<Self> {
        if capacity < MIN_POOL_SIZE {
            return Err(PoolError::region_too_small(capacity, MIN_POOL_SIZE));
        }
        let layout = Layout::from_size_align(capacity, MIN_ALIGN).map_err(|_| {
            PoolError::InvalidRequest {
                reason: format!("capacity {capacity} is not a valid allocation size"),
            }
        })?;

        // SAFETY: layout has non-zero size (>= MIN_POOL_SIZE) and valid alignment.
        let raw = unsafe { alloc::alloc(layout) };
        let base =
            NonNull::new(raw).ok_or_else(|| PoolError::backing_allocation_failed(capacity))?;

        #[cfg(feature = "logging")]
        debug!(capacity, "pool initialized with owned backing storage");

        Ok(Self {
            base,
            capacity,
            owned: true,
            config,
            state: UnsafeCell::new(PoolState {
                frontier: 0,
                free: FreeList::new(),
            }),
        })
    }

    /// Claim a caller-supplied region as the pool.
    ///
    /// The region is borrowed, not copied: the allocator embeds all of its
    /// bookkeeping inside it and is its sole mutator until drop.
    ///
    /// # Safety
    ///
    /// - `base` must point to `size` bytes of memory valid (and unused by
    ///   anything else) for the entire lifetime of the returned pool.
    /// - The region must not be accessed except through pointers handed out
    ///   by this pool.
    pub unsafe fn from_raw_region(base: NonNull<u8>, size: usize) -> PoolResult<Self> {
        if size < MIN_POOL_SIZE {
            return Err(PoolError::region_too_small(size, MIN_POOL_SIZE));
        }
        let addr = base.as_ptr() as usize;
        if addr % MIN_ALIGN != 0 {
            return Err(PoolError::misaligned_region(addr, MIN_ALIGN));
        }

        #[cfg(feature = "logging")]
        debug!(capacity = size, "pool initialized over caller-supplied region");

        Ok(Self {
            base,
            capacity: size,
            owned: false,
            config: PoolConfig::default(),
            state: UnsafeCell::new(PoolState {
                frontier: 0,
                free: FreeList::new(),
            }),
        })
    }

    /// Total size of the managed region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocate memory for `layout`.
    ///
    /// The payload is at least `layout.size()` bytes, aligned to the pool's
    /// alignment boundary. Alignments above [`MIN_ALIGN`] are rejected rather
    /// than silently under-aligned.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfMemory`] when no block fits even after an exhaustive
    /// coalescing pass; the pool stays fully usable.
    ///
    /// # Safety
    ///
    /// The returned pointer must be deallocated with this same pool, and must
    /// not be used after that.
    pub unsafe fn allocate(&self, layout: Layout) -> PoolResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Err(PoolError::zero_size());
        }
        if layout.align() > MIN_ALIGN {
            return Err(PoolError::invalid_alignment(layout.align()));
        }

        let size = align_up(layout.size(), MIN_ALIGN);
        let payload = self.alloc_inner(size)?;

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: alloc_inner handed out a block with `size` payload bytes.
            unsafe { ptr::write_bytes(payload.as_ptr(), pattern, size) };
        }

        Ok(NonNull::slice_from_raw_parts(payload, size))
    }

    /// Convenience wrapper over [`allocate`](Self::allocate) for raw byte
    /// requests.
    ///
    /// # Safety
    ///
    /// Same contract as [`allocate`](Self::allocate).
    pub unsafe fn allocate_bytes(&self, size: usize) -> PoolResult<NonNull<u8>> {
        let layout = Layout::from_size_align(size, 1)
            .map_err(|_| PoolError::zero_size())?;
        // SAFETY: forwarded caller contract.
        unsafe { self.allocate(layout) }.map(NonNull::cast)
    }

    fn alloc_inner(&self, size: usize) -> PoolResult<NonNull<u8>> {
        // SAFETY: single-mutator contract; no other reference to the state
        // exists while this method runs (the pool is !Sync and nothing here
        // re-enters the allocator).
        let state = unsafe { &mut *self.state.get() };

        // Fast path: carve from the never-touched frontier.
        if self.capacity - state.frontier >= HEADER_SIZE + size {
            // SAFETY: the frontier is MIN_ALIGN-aligned by construction (it
            // only ever advances by HEADER_SIZE plus aligned sizes), and the
            // bounds check above guarantees room for header and payload.
            let block = unsafe {
                let at = self.base.as_ptr().add(state.frontier);
                block::write_header(at, size, true)
            };
            state.frontier += HEADER_SIZE + size;
            // SAFETY: freshly written valid header.
            return Ok(unsafe { block::payload(block) });
        }

        // Slow path: first fit over the free list; on a miss, coalesce
        // exhaustively and retry exactly once.
        // SAFETY: the list holds only valid headers of this live pool.
        let found = unsafe {
            state.free.take_fit(size).or_else(|| {
                #[cfg(feature = "logging")]
                debug!(requested = size, "fit search missed, running exhaustive coalesce");
                state.free.coalesce_all();
                state.free.take_fit(size)
            })
        };

        match found {
            Some(block) => {
                // SAFETY: take_fit returned a valid, unlinked, free header.
                unsafe {
                    (*block).mark_used();
                    (*block).next = ptr::null_mut();
                    Ok(block::payload(block))
                }
            }
            None => {
                let (_, in_list) = unsafe { state.free.totals() };
                let available = (self.capacity - state.frontier) + in_list;
                Err(PoolError::out_of_memory(size, available))
            }
        }
    }

    /// Return an allocation to the pool.
    ///
    /// The block is marked free, spliced into the address-ordered free list
    /// and opportunistically merged with its immediate neighbors.
    ///
    /// Double frees and pointers foreign to this pool are consistency
    /// violations: they are detected defensively (bounds, alignment and
    /// in-use checks) and panic, since continuing would risk corrupting
    /// unrelated allocations.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this pool's `allocate` and must be
    /// live (not freed since).
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: single-mutator contract, as in alloc_inner.
        let state = unsafe { &mut *self.state.get() };

        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        assert!(
            addr >= base + HEADER_SIZE && addr < base + state.frontier,
            "consistency violation: freed pointer does not belong to this pool"
        );
        assert_eq!(
            addr % MIN_ALIGN,
            0,
            "consistency violation: freed pointer is misaligned"
        );

        // SAFETY: the pointer passed the bounds and alignment checks, so the
        // header recovered from it lies inside the carved region.
        unsafe {
            let header = block::from_payload(ptr);
            assert!(
                (*header).is_used(),
                "consistency violation: double free or foreign pointer"
            );
            debug_assert!(
                layout.size() <= (*header).size(),
                "freed layout larger than the block payload"
            );

            if let Some(pattern) = self.config.dealloc_pattern {
                ptr::write_bytes(ptr.as_ptr(), pattern, (*header).size());
            }

            (*header).mark_free();
            state.free.insert(header);
        }
    }

    /// Grow or shrink an allocation, moving it if necessary.
    ///
    /// Shrinking (or growing within the block's existing payload) is always
    /// in place; growing beyond it allocates, copies and frees the original.
    ///
    /// # Safety
    ///
    /// - `ptr` must be a live allocation of this pool made with `old_layout`.
    /// - On success `ptr` is invalid; use the returned pointer instead.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> PoolResult<NonNull<[u8]>> {
        if new_layout.size() == 0 {
            return Err(PoolError::zero_size());
        }
        if new_layout.align() > MIN_ALIGN {
            return Err(PoolError::invalid_alignment(new_layout.align()));
        }

        let new_size = align_up(new_layout.size(), MIN_ALIGN);

        // SAFETY: caller guarantees `ptr` is a live allocation of this pool.
        unsafe {
            let header = block::from_payload(ptr);
            assert!(
                (*header).is_used(),
                "consistency violation: reallocating a freed pointer"
            );

            if (*header).size() >= new_size {
                return Ok(NonNull::slice_from_raw_parts(ptr, (*header).size()));
            }

            let new = self.allocate(new_layout)?;
            ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new.as_ptr().cast::<u8>(),
                old_layout.size().min(new_layout.size()),
            );
            self.deallocate(ptr, old_layout);
            Ok(new)
        }
    }

    /// Run the exhaustive coalescing pass.
    ///
    /// Normally triggered automatically on allocation pressure; exposed for
    /// callers that want to pay the cost at a time of their choosing. Running
    /// it twice in a row yields an identical free list the second time.
    pub fn coalesce(&self) {
        // SAFETY: single-mutator contract; list holds valid headers.
        unsafe {
            let state = &mut *self.state.get();
            if !state.free.is_empty() {
                state.free.coalesce_all();
            }
        }
    }

    // ========================================================================
    // Diagnostics (read-only; never consulted by the allocation path)
    // ========================================================================

    /// Total free bytes: free payloads, their header overhead, and the
    /// untouched frontier. A fully freed, fully coalesced pool reports
    /// exactly [`capacity`](Self::capacity).
    pub fn free_bytes(&self) -> usize {
        // SAFETY: shared read of pool state under the single-mutator contract.
        unsafe {
            let state = &*self.state.get();
            let (_, in_list) = state.free.totals();
            (self.capacity - state.frontier) + in_list
        }
    }

    /// Total bytes held by live allocations, header overhead included.
    pub fn used_bytes(&self) -> usize {
        let mut used = 0;
        self.walk_blocks(|_, size, in_use| {
            if in_use {
                used += HEADER_SIZE + size;
            }
        });
        used
    }

    /// Number of blocks currently in the free list.
    pub fn free_block_count(&self) -> usize {
        // SAFETY: shared read of pool state under the single-mutator contract.
        unsafe {
            let state = &*self.state.get();
            state.free.totals().0
        }
    }

    /// Number of live allocations.
    pub fn used_block_count(&self) -> usize {
        let mut count = 0;
        self.walk_blocks(|_, _, in_use| {
            if in_use {
                count += 1;
            }
        });
        count
    }

    /// Snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        let mut used_bytes = 0;
        let mut used_blocks = 0;
        self.walk_blocks(|_, size, in_use| {
            if in_use {
                used_bytes += HEADER_SIZE + size;
                used_blocks += 1;
            }
        });
        // SAFETY: shared read of pool state under the single-mutator contract.
        let (free_blocks, frontier, in_list) = unsafe {
            let state = &*self.state.get();
            let (count, bytes) = state.free.totals();
            (count, state.frontier, bytes)
        };
        PoolStats {
            capacity: self.capacity,
            free_bytes: (self.capacity - frontier) + in_list,
            used_bytes,
            free_blocks,
            used_blocks,
            frontier,
        }
    }

    /// Full listing of carved blocks in physical order: header offset from
    /// the pool base, payload size, and in-use status.
    pub fn blocks(&self) -> Vec<BlockInfo> {
        let mut out = Vec::new();
        self.walk_blocks(|offset, size, in_use| {
            out.push(BlockInfo {
                offset,
                size,
                in_use,
            });
        });
        out
    }

    /// Fragmentation snapshot: the untouched frontier counts as one fragment
    /// while it can still hold a block.
    pub fn fragmentation(&self) -> FragmentationStats {
        // SAFETY: shared read of pool state under the single-mutator contract.
        unsafe {
            let state = &*self.state.get();
            let (list_count, in_list) = state.free.totals();
            let remainder = self.capacity - state.frontier;

            let mut largest = state.free.largest();
            let mut fragments = list_count;
            if remainder >= MIN_POOL_SIZE {
                largest = largest.max(remainder - HEADER_SIZE);
                fragments += 1;
            }
            FragmentationStats::calculate(remainder + in_list, largest, fragments)
        }
    }

    /// Walk the pool and verify every structural invariant: carved blocks
    /// tile the region exactly, sizes stay aligned, and the free list is
    /// ordered, in-bounds, free-flagged and acyclic.
    ///
    /// Diagnostics and tests only; the allocation path never runs this.
    pub fn validate(&self) -> Result<(), &'static str> {
        // SAFETY: shared read of pool state under the single-mutator contract.
        unsafe {
            let state = &*self.state.get();
            let base = self.base.as_ptr() as usize;

            // Carved blocks must tile [0, frontier) with zero gaps.
            let mut offset = 0;
            while offset < state.frontier {
                let header = self.base.as_ptr().add(offset).cast::<BlockHeader>();
                let size = (*header).size();
                if size == 0 || size % MIN_ALIGN != 0 {
                    return Err("corrupt block size");
                }
                offset += HEADER_SIZE + size;
                if offset > state.frontier {
                    return Err("block overruns the carved region");
                }
            }
            if offset != state.frontier {
                return Err("blocks do not tile the carved region");
            }

            // Free list: ordered, in bounds, free, acyclic.
            let max_nodes = self.capacity / HEADER_SIZE + 1;
            let mut seen = 0;
            let mut prev_addr = 0usize;
            let mut cur = state.free.head();
            while !cur.is_null() {
                let addr = cur as usize;
                if addr < base || addr >= base + state.frontier {
                    return Err("free block outside the carved region");
                }
                if (*cur).is_used() {
                    return Err("in-use block linked into the free list");
                }
                if addr <= prev_addr {
                    return Err("free list not in strict address order");
                }
                prev_addr = addr;
                seen += 1;
                if seen > max_nodes {
                    return Err("free-list cycle suspected");
                }
                cur = (*cur).next;
            }
            Ok(())
        }
    }

    /// Visit every carved block in physical address order.
    fn walk_blocks(&self, mut f: impl FnMut(usize, usize, bool)) {
        // SAFETY: shared read of pool state under the single-mutator contract;
        // carved blocks tile the region by the allocator's invariants.
        unsafe {
            let state = &*self.state.get();
            let mut offset = 0;
            while offset < state.frontier {
                let header = self.base.as_ptr().add(offset).cast::<BlockHeader>();
                let size = (*header).size();
                f(offset, size, (*header).is_used());
                offset += HEADER_SIZE + size;
            }
        }
    }
}

impl Drop for PoolAllocator {
    fn drop(&mut self) {
        if self.config.leak_check && !std::thread::panicking() {
            let state = self.state.get_mut();
            // SAFETY: exclusive access via &mut self; list holds valid headers.
            let free_total = unsafe {
                state.free.coalesce_all();
                let (_, in_list) = state.free.totals();
                (self.capacity - state.frontier) + in_list
            };
            assert!(
                free_total == self.capacity,
                "leak detected at pool teardown: {} of {} bytes still allocated",
                self.capacity - free_total,
                self.capacity
            );
        }

        if self.owned {
            // SAFETY: same layout as the allocation in with_config; the pool
            // is being dropped, so no pointers into the region remain valid.
            unsafe {
                alloc::dealloc(
                    self.base.as_ptr(),
                    Layout::from_size_align_unchecked(self.capacity, MIN_ALIGN),
                );
            }
        }
    }
}

impl core::fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let stats = self.stats();
        f.debug_struct("PoolAllocator")
            .field("capacity", &self.capacity)
            .field("owned", &self.owned)
            .field("free_bytes", &stats.free_bytes)
            .field("used_blocks", &stats.used_blocks)
            .finish_non_exhaustive()
    }
}
