//! Block header codec
//!
//! Every block managed by the pool is a fixed-size header followed directly by
//! the payload handed to the caller. The header packs the payload size and the
//! in-use flag into a single word: payload sizes are always a multiple of
//! [`MIN_ALIGN`], so the low bit never carries size information and is free to
//! hold the flag. The second word links the block into whichever list
//! currently tracks it (null while allocated).
//!
//! All raw pointer arithmetic of the crate lives behind the handful of unsafe
//! primitives in this module; the list, split and merge logic above is written
//! against these primitives and validated handles only.

use core::mem;
use core::ptr::NonNull;

use crate::core::types::{align_up, alignment::MIN_ALIGN};

/// In-use flag, stored in the low bit of the packed size word.
const USED_BIT: usize = 0x1;

/// Size of a block header in bytes, rounded up to the alignment boundary so
/// payloads stay aligned.
pub(crate) const HEADER_SIZE: usize = align_up(mem::size_of::<BlockHeader>(), MIN_ALIGN);

/// Smallest payload a split may leave behind as a new free block. A remainder
/// below this threshold stays attached to the allocated block instead of
/// becoming an unusable stub.
pub(crate) const MIN_SPLIT_PAYLOAD: usize = HEADER_SIZE;

/// Block metadata, embedded in pool memory immediately before the payload.
#[repr(C)]
pub(crate) struct BlockHeader {
    /// Payload size in bytes with the in-use flag packed into the low bit.
    size_flag: usize,
    /// Next block in the list that currently tracks this block, or null.
    pub(crate) next: *mut BlockHeader,
}

impl BlockHeader {
    /// Payload size with the in-use flag masked off.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size_flag & !USED_BIT
    }

    #[inline]
    pub(crate) fn is_used(&self) -> bool {
        self.size_flag & USED_BIT != 0
    }

    /// Set the payload size, preserving the in-use flag.
    ///
    /// `size` must be a multiple of [`MIN_ALIGN`]; anything else would collide
    /// with the flag bit.
    #[inline]
    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert_eq!(size % MIN_ALIGN, 0, "block size must be aligned");
        self.size_flag = size | (self.size_flag & USED_BIT);
    }

    #[inline]
    pub(crate) fn mark_used(&mut self) {
        self.size_flag |= USED_BIT;
    }

    #[inline]
    pub(crate) fn mark_free(&mut self) {
        self.size_flag &= !USED_BIT;
    }
}

/// Write a fresh header at `at` and return it as a block pointer.
///
/// # Safety
///
/// - `at` must point to at least `HEADER_SIZE + size` writable bytes inside
///   the pool and be aligned to [`MIN_ALIGN`].
/// - `size` must be a multiple of [`MIN_ALIGN`].
#[inline]
pub(crate) unsafe fn write_header(at: *mut u8, size: usize, used: bool) -> *mut BlockHeader {
    debug_assert_eq!(at as usize % MIN_ALIGN, 0, "block start must be aligned");
    debug_assert_eq!(size % MIN_ALIGN, 0, "block size must be aligned");

    let block = at.cast::<BlockHeader>();
    // SAFETY: caller guarantees `at` points to enough writable, aligned memory.
    unsafe {
        (*block).size_flag = if used { size | USED_BIT } else { size };
        (*block).next = core::ptr::null_mut();
    }
    block
}

/// Recover the owning block from a payload pointer handed out by `allocate`.
///
/// # Safety
///
/// `payload` must be a pointer previously produced by [`payload`] for a block
/// that is still independently addressable (not merged away).
#[inline]
pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> *mut BlockHeader {
    // SAFETY: caller guarantees the payload was derived from a live header
    // exactly HEADER_SIZE bytes earlier.
    unsafe { payload.as_ptr().sub(HEADER_SIZE).cast::<BlockHeader>() }
}

/// Usable payload pointer for a block.
///
/// # Safety
///
/// `block` must point to a valid header inside the pool.
#[inline]
pub(crate) unsafe fn payload(block: *mut BlockHeader) -> NonNull<u8> {
    // SAFETY: a valid block is followed by at least `size` payload bytes, and
    // block pointers are never null inside the pool.
    unsafe { NonNull::new_unchecked(block.cast::<u8>().add(HEADER_SIZE)) }
}

/// Address immediately after a block's header and payload: the candidate
/// location of the next physically contiguous block.
///
/// # Safety
///
/// `block` must point to a valid header inside the pool.
#[inline]
pub(crate) unsafe fn physical_end(block: *mut BlockHeader) -> *mut u8 {
    // SAFETY: caller guarantees a valid header; size is trusted pool state.
    unsafe { block.cast::<u8>().add(HEADER_SIZE + (*block).size()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(8))]
    struct Scratch([u8; 256]);

    #[test]
    fn test_header_size_is_aligned() {
        assert_eq!(HEADER_SIZE % MIN_ALIGN, 0);
        assert!(HEADER_SIZE >= mem::size_of::<BlockHeader>());
    }

    #[test]
    fn test_flag_packing_preserves_size() {
        let mut scratch = Scratch([0; 256]);
        unsafe {
            let block = write_header(scratch.0.as_mut_ptr(), 64, false);
            assert_eq!((*block).size(), 64);
            assert!(!(*block).is_used());

            (*block).mark_used();
            assert_eq!((*block).size(), 64);
            assert!((*block).is_used());

            (*block).set_size(128);
            assert_eq!((*block).size(), 128);
            assert!((*block).is_used(), "set_size must preserve the flag");

            (*block).mark_free();
            assert_eq!((*block).size(), 128);
            assert!(!(*block).is_used());
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let mut scratch = Scratch([0; 256]);
        unsafe {
            let block = write_header(scratch.0.as_mut_ptr(), 32, true);
            let payload_ptr = payload(block);
            assert_eq!(
                payload_ptr.as_ptr() as usize - block as usize,
                HEADER_SIZE
            );
            assert_eq!(from_payload(payload_ptr), block);
        }
    }

    #[test]
    fn test_physical_end() {
        let mut scratch = Scratch([0; 256]);
        unsafe {
            let block = write_header(scratch.0.as_mut_ptr(), 40, false);
            let end = physical_end(block);
            assert_eq!(end as usize - block as usize, HEADER_SIZE + 40);
        }
    }
}
