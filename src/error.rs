//! Standalone error types for poolfit
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Allocation-path failures (out of memory, bad requests) are ordinary return
//! values and never corrupt the pool. Consistency violations (double free,
//! foreign pointers, broken free-list structure) are *not* represented here:
//! they are fatal and surface as panics, because continuing after a corrupted
//! free list risks silently damaging unrelated allocations.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

/// Pool allocation errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No block can satisfy the request, even after an exhaustive coalescing
    /// pass. The pool itself remains fully usable.
    #[error("out of memory: requested {requested} bytes, {available} bytes free")]
    OutOfMemory { requested: usize, available: usize },

    /// The request was rejected before touching pool memory.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The requested layout alignment exceeds what the pool guarantees.
    #[error("unsupported alignment: {alignment}")]
    InvalidAlignment { alignment: usize },

    /// The backing region for an owned pool could not be obtained from the
    /// system allocator.
    #[error("failed to allocate {capacity} bytes of backing storage")]
    BackingAllocationFailed { capacity: usize },
}

impl PoolError {
    /// Check if error is retryable (after freeing memory, for instance)
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "POOL:ALLOC:OOM",
            Self::InvalidRequest { .. } => "POOL:REQUEST:INVALID",
            Self::InvalidAlignment { .. } => "POOL:REQUEST:ALIGN",
            Self::BackingAllocationFailed { .. } => "POOL:INIT:BACKING",
        }
    }

    // ========================================================================
    // Convenience Constructors
    // ========================================================================

    /// Create out-of-memory error
    pub fn out_of_memory(requested: usize, available: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(requested, available, "pool out of memory");

        Self::OutOfMemory {
            requested,
            available,
        }
    }

    /// Create zero-size request error
    pub fn zero_size() -> Self {
        Self::InvalidRequest {
            reason: "allocation size must be greater than zero".to_string(),
        }
    }

    /// Create region-too-small error
    pub fn region_too_small(size: usize, min: usize) -> Self {
        Self::InvalidRequest {
            reason: format!("region of {size} bytes cannot hold a pool (minimum {min})"),
        }
    }

    /// Create misaligned-region error
    pub fn misaligned_region(addr: usize, align: usize) -> Self {
        Self::InvalidRequest {
            reason: format!("region base {addr:#x} is not aligned to {align}"),
        }
    }

    /// Create invalid alignment error
    #[must_use]
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    /// Create backing allocation failure error
    pub fn backing_allocation_failed(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(capacity, "backing storage allocation failed");

        Self::BackingAllocationFailed { capacity }
    }
}

/// Result type for pool operations
pub type PoolResult<T> = core::result::Result<T, PoolError>;
