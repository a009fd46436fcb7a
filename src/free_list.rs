//! Address-ordered intrusive free list
//!
//! Free blocks are chained through their own headers (no bookkeeping memory
//! outside the pool) in strictly increasing address order. Address ordering
//! makes physical adjacency a local O(1) check at each insertion point, which
//! is what keeps opportunistic coalescing cheap.
//!
//! Two coalescing tiers operate on this list:
//! - every [`insert`](FreeList::insert) tries to merge the new block with its
//!   left and right list neighbors, once each;
//! - [`coalesce_all`](FreeList::coalesce_all) runs the exhaustive pass, used
//!   only as the fallback when a fit search fails.
//!
//! Detected structural violations (a block inserted twice, an in-use block on
//! the list, a self-loop) are fatal: the list panics rather than continue on
//! a corrupted structure.

use crate::block::{self, BlockHeader, HEADER_SIZE, MIN_SPLIT_PAYLOAD};

/// Singly-linked, address-sorted list of free blocks.
pub(crate) struct FreeList {
    head: *mut BlockHeader,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self {
            head: core::ptr::null_mut(),
        }
    }

    #[inline]
    pub(crate) fn head(&self) -> *mut BlockHeader {
        self.head
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Splice `block` into the list at its address-sorted position and merge
    /// it with its immediate neighbors where physically contiguous.
    ///
    /// Panics if `block` is already present (double free) or marked in-use.
    ///
    /// # Safety
    ///
    /// `block` must point to a valid header inside the live pool and must not
    /// currently be linked into any list.
    pub(crate) unsafe fn insert(&mut self, block: *mut BlockHeader) {
        assert!(!block.is_null(), "cannot insert null block into free list");
        // SAFETY: caller guarantees `block` is a valid header.
        unsafe {
            assert!(
                !(*block).is_used(),
                "consistency violation: in-use block inserted into free list"
            );

            if self.head.is_null() {
                (*block).next = core::ptr::null_mut();
                self.head = block;
                return;
            }

            assert!(
                block != self.head,
                "consistency violation: block already heads the free list (double free?)"
            );

            if (block as usize) < (self.head as usize) {
                (*block).next = self.head;
                self.head = block;
                self.try_merge(block, (*block).next);
                return;
            }

            // Find the last entry whose address precedes the new block.
            let mut prev = self.head;
            loop {
                let next = (*prev).next;
                assert!(prev != next, "consistency violation: free-list self-loop");
                assert!(
                    next != block,
                    "consistency violation: block already in free list (double free?)"
                );
                if next.is_null() || (next as usize) > (block as usize) {
                    break;
                }
                prev = next;
            }

            (*block).next = (*prev).next;
            (*prev).next = block;

            // Opportunistic coalescing: one check right, one check left.
            self.try_merge(block, (*block).next);
            self.try_merge(prev, block);
        }
    }

    /// Unlink `block` from the list.
    ///
    /// Panics if the block is not present — a caller holding a stale handle is
    /// a corruption signal, not a recoverable condition.
    ///
    /// # Safety
    ///
    /// `block` must point to a valid header inside the live pool.
    pub(crate) unsafe fn remove(&mut self, block: *mut BlockHeader) {
        // SAFETY: caller guarantees `block` is a valid header; list nodes are
        // valid headers by the insert contract.
        unsafe {
            if self.head == block {
                self.head = (*block).next;
                (*block).next = core::ptr::null_mut();
                return;
            }

            let mut tmp = self.head;
            while !tmp.is_null() {
                if (*tmp).next == block {
                    (*tmp).next = (*block).next;
                    (*block).next = core::ptr::null_mut();
                    return;
                }
                assert!(tmp != (*tmp).next, "consistency violation: free-list self-loop");
                tmp = (*tmp).next;
            }

            panic!("consistency violation: block not found in free list");
        }
    }

    /// First-fit search with splitting.
    ///
    /// Scans in address order for the first block whose payload holds `size`
    /// bytes. If the winner exceeds the request by more than one header plus
    /// the minimum split payload, the excess is split off as a new free block
    /// spliced into the winner's list position. The winner itself is removed
    /// from the list and returned with its in-use flag still clear.
    ///
    /// Returns `None` when no block fits; the pool then runs the exhaustive
    /// coalescing pass and retries exactly once.
    ///
    /// # Safety
    ///
    /// The list must only contain valid headers of the live pool, and `size`
    /// must be a multiple of the alignment boundary.
    pub(crate) unsafe fn take_fit(&mut self, size: usize) -> Option<*mut BlockHeader> {
        // SAFETY: list nodes are valid headers by the insert contract.
        unsafe {
            let mut cur = self.head;
            while !cur.is_null() {
                assert!(
                    !(*cur).is_used(),
                    "consistency violation: in-use block found in free list"
                );
                if (*cur).size() >= size {
                    break;
                }
                assert!(cur != (*cur).next, "consistency violation: free-list self-loop");
                cur = (*cur).next;
            }

            if cur.is_null() {
                return None;
            }

            if (*cur).size() >= size + HEADER_SIZE + MIN_SPLIT_PAYLOAD {
                let remainder_at = cur.cast::<u8>().add(HEADER_SIZE + size);
                let remainder =
                    block::write_header(remainder_at, (*cur).size() - size - HEADER_SIZE, false);
                (*remainder).next = (*cur).next;
                (*cur).next = remainder;
                (*cur).set_size(size);
            }

            self.remove(cur);
            Some(cur)
        }
    }

    /// Exhaustive coalescing: merge every run of physically contiguous free
    /// blocks in a single pass over the list.
    ///
    /// # Safety
    ///
    /// The list must only contain valid headers of the live pool.
    pub(crate) unsafe fn coalesce_all(&mut self) {
        // SAFETY: list nodes are valid headers by the insert contract.
        unsafe {
            let mut cur = self.head;
            while !cur.is_null() {
                while self.try_merge(cur, (*cur).next) {}
                cur = (*cur).next;
            }
        }
    }

    /// Merge `b2` into `b1` if both are free and physically contiguous.
    ///
    /// On success `b1` absorbs `b2`'s payload plus its header, and `b2`'s
    /// header ceases to be independently valid.
    ///
    /// # Safety
    ///
    /// Both pointers must be null or valid headers of the live pool, with
    /// `b2` being `b1`'s list successor when non-null.
    unsafe fn try_merge(&mut self, b1: *mut BlockHeader, b2: *mut BlockHeader) -> bool {
        if b1.is_null() || b2.is_null() {
            return false;
        }
        // SAFETY: caller guarantees both are valid headers.
        unsafe {
            assert!(
                !(*b1).is_used() && !(*b2).is_used(),
                "consistency violation: coalescing across an in-use block"
            );
            if block::physical_end(b1) != b2.cast::<u8>() {
                return false;
            }
            (*b1).set_size((*b1).size() + HEADER_SIZE + (*b2).size());
            (*b1).next = (*b2).next;
            true
        }
    }

    /// Number of blocks and total bytes (payload plus header overhead) held
    /// by the list. Diagnostics only.
    ///
    /// # Safety
    ///
    /// The list must only contain valid headers of the live pool.
    pub(crate) unsafe fn totals(&self) -> (usize, usize) {
        let mut count = 0;
        let mut bytes = 0;
        // SAFETY: list nodes are valid headers by the insert contract.
        unsafe {
            let mut cur = self.head;
            while !cur.is_null() {
                count += 1;
                bytes += HEADER_SIZE + (*cur).size();
                cur = (*cur).next;
            }
        }
        (count, bytes)
    }

    /// Largest single payload available in the list. Diagnostics only.
    ///
    /// # Safety
    ///
    /// The list must only contain valid headers of the live pool.
    pub(crate) unsafe fn largest(&self) -> usize {
        let mut largest = 0;
        // SAFETY: list nodes are valid headers by the insert contract.
        unsafe {
            let mut cur = self.head;
            while !cur.is_null() {
                largest = largest.max((*cur).size());
                cur = (*cur).next;
            }
        }
        largest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::write_header;

    #[repr(align(8))]
    struct Scratch([u8; 1024]);

    /// Carve `sizes` contiguous free blocks starting at the scratch base.
    unsafe fn carve(scratch: &mut Scratch, sizes: &[usize]) -> Vec<*mut BlockHeader> {
        let mut blocks = Vec::new();
        let mut offset = 0;
        for &size in sizes {
            // SAFETY: test scratch is aligned and large enough.
            let block = unsafe { write_header(scratch.0.as_mut_ptr().add(offset), size, false) };
            blocks.push(block);
            offset += HEADER_SIZE + size;
        }
        blocks
    }

    #[test]
    fn test_insert_keeps_address_order_without_adjacency() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            // Carve four blocks, insert the 1st and 3rd: not contiguous, so
            // they must survive as two ordered entries.
            let blocks = carve(&mut scratch, &[32, 32, 32, 32]);
            list.insert(blocks[2]);
            list.insert(blocks[0]);

            assert_eq!(list.head(), blocks[0]);
            assert_eq!((*blocks[0]).next, blocks[2]);
            assert!((*blocks[2]).next.is_null());
            assert_eq!(list.totals(), (2, 2 * (HEADER_SIZE + 32)));
        }
    }

    #[test]
    fn test_insert_merges_contiguous_neighbors() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[32, 32, 32]);
            list.insert(blocks[0]);
            list.insert(blocks[2]);
            // Inserting the middle block bridges all three into one.
            list.insert(blocks[1]);

            assert_eq!(list.head(), blocks[0]);
            assert!((*blocks[0]).next.is_null());
            assert_eq!((*blocks[0]).size(), 3 * 32 + 2 * HEADER_SIZE);
        }
    }

    #[test]
    fn test_take_fit_first_fit_and_split() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[128]);
            list.insert(blocks[0]);

            let taken = list.take_fit(32).expect("fit must be found");
            assert_eq!(taken, blocks[0]);
            assert_eq!((*taken).size(), 32, "winner truncated to the request");

            // Remainder stays in the list: 128 - 32 - HEADER_SIZE bytes.
            let (count, _) = list.totals();
            assert_eq!(count, 1);
            assert_eq!(list.largest(), 128 - 32 - HEADER_SIZE);
        }
    }

    #[test]
    fn test_take_fit_skips_small_remainder() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[40]);
            list.insert(blocks[0]);

            // 40 - 32 = 8 < HEADER_SIZE + MIN_SPLIT_PAYLOAD: no split, the
            // whole block is handed out.
            let taken = list.take_fit(32).expect("fit must be found");
            assert_eq!((*taken).size(), 40);
            assert!(list.is_empty());
        }
    }

    #[test]
    fn test_take_fit_misses_when_too_small() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[32, 32]);
            list.insert(blocks[0]);
            assert!(list.take_fit(64).is_none());
        }
    }

    #[test]
    fn test_coalesce_all_merges_runs() {
        let mut scratch = Scratch([0; 1024]);
        unsafe {
            let mut blocks = carve(&mut scratch, &[32, 32, 32, 32]);
            // Block 2 is in use, leaving two runs: [0,1] contiguous, [3] alone.
            (*blocks[2]).mark_used();

            // Hand-link the entries without the per-insert merge, simulating
            // the window between a free and its merge step.
            (*blocks[0]).next = blocks[1];
            (*blocks[1]).next = blocks[3];
            (*blocks[3]).next = core::ptr::null_mut();
            let mut list = FreeList { head: blocks[0] };

            list.coalesce_all();

            let (count, bytes) = list.totals();
            assert_eq!(count, 2);
            assert_eq!(bytes, 3 * (HEADER_SIZE + 32));
            assert_eq!((*blocks[0]).size(), 2 * 32 + HEADER_SIZE);
        }
    }

    #[test]
    fn test_remove_head_and_middle() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[32, 32, 32, 32, 32]);
            // Insert every other block so nothing merges.
            list.insert(blocks[0]);
            list.insert(blocks[2]);
            list.insert(blocks[4]);

            list.remove(blocks[2]);
            assert_eq!(list.head(), blocks[0]);
            assert_eq!((*blocks[0]).next, blocks[4]);

            list.remove(blocks[0]);
            assert_eq!(list.head(), blocks[4]);
        }
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_insert_panics() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let blocks = carve(&mut scratch, &[32, 32, 32]);
            list.insert(blocks[0]);
            list.insert(blocks[2]);
            list.insert(blocks[2]);
        }
    }

    #[test]
    #[should_panic(expected = "in-use block")]
    fn test_insert_used_block_panics() {
        let mut scratch = Scratch([0; 1024]);
        let mut list = FreeList::new();
        unsafe {
            let mut blocks = carve(&mut scratch, &[32]);
            (*blocks[0]).mark_used();
            list.insert(blocks[0]);
        }
    }
}
