//! # poolfit
//!
//! A fixed-pool memory allocator: hand it one contiguous region (or let it
//! own one) and it serves `allocate`/`deallocate` out of that region with no
//! dependency on the operating-system heap for its bookkeeping. Built for
//! embedded targets, custom runtimes and language implementations where the
//! platform allocator is unavailable, too slow, or must be deterministic.
//!
//! ## Design
//!
//! - Block headers live inside the pool, directly before each payload; the
//!   in-use flag is packed into the low bit of the size word.
//! - Free blocks form a singly-linked, address-ordered intrusive list, so
//!   physical adjacency is a local O(1) check.
//! - Allocation tries a bump frontier (never-yet-carved pool tail) first,
//!   then first-fit over the free list with block splitting.
//! - Coalescing is two-tier: every free merges its immediate neighbors, and
//!   a full-list pass runs only when a fit search fails — cheap continuous
//!   hygiene plus an expensive sweep only under allocation pressure.
//!
//! ## Quick Start
//!
//! ```rust
//! use core::alloc::Layout;
//! use poolfit::PoolAllocator;
//!
//! fn main() -> poolfit::PoolResult<()> {
//!     let pool = PoolAllocator::new(80 * 1024)?;
//!
//!     let layout = Layout::from_size_align(1024, 8).unwrap();
//!     unsafe {
//!         let ptr = pool.allocate(layout)?;
//!         // ... use the memory ...
//!         pool.deallocate(ptr.cast(), layout);
//!     }
//!
//!     assert_eq!(pool.free_bytes(), pool.capacity());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured logging of init, coalescing pressure
//!   and out-of-memory events via `tracing`
//!
//! ## Concurrency
//!
//! A [`PoolAllocator`] is a synchronous, single-threaded structure (`Send`,
//! not `Sync`). To share one across threads, use [`LockedPool`] — one lock
//! guarding the whole pool — or equivalent external serialization.

#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Precision loss in usize -> f64 casts is acceptable for fragmentation stats
#![allow(clippy::cast_precision_loss)]
// Cast truncation in memory code is reviewed per-site
#![allow(clippy::cast_possible_truncation)]
// inline(always)-style hints on small header accessors are intentional
#![allow(clippy::inline_always)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
mod block;
pub mod core;
mod free_list;
pub mod pool;
pub mod stats;
pub mod sync;

// Re-export core types for convenience
pub use crate::allocator::Allocator;
pub use crate::error::{PoolError, PoolResult};
pub use crate::pool::{MIN_POOL_SIZE, PoolAllocator, PoolConfig};
pub use crate::stats::{BlockInfo, FragmentationStats, PoolStats};
pub use crate::sync::LockedPool;

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::allocator::Allocator;
    pub use crate::core::types::alignment::MIN_ALIGN;
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::{PoolAllocator, PoolConfig};
    pub use crate::stats::{BlockInfo, FragmentationStats, PoolStats};
    pub use crate::sync::LockedPool;
}
