//! Read-only diagnostics for pool allocators
//!
//! Everything in this module is produced by traversal only: the allocation
//! path never consults it, and none of it mutates pool state. Intended for
//! tests, operator visibility and capacity planning.

use core::fmt;

/// Snapshot of a pool's counters.
///
/// Invariant: `used_bytes + free_bytes == capacity` at every point in the
/// pool's life (header overhead is attributed to whichever side owns the
/// block, and untouched frontier space counts as free).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total size of the managed region in bytes.
    pub capacity: usize,
    /// Free payload bytes plus their header overhead plus the untouched
    /// frontier.
    pub free_bytes: usize,
    /// Live allocation payload bytes plus their header overhead.
    pub used_bytes: usize,
    /// Blocks currently in the free list.
    pub free_blocks: usize,
    /// Live allocations.
    pub used_blocks: usize,
    /// Byte offset of the first never-carved byte.
    pub frontier: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoolStats {{ capacity: {} bytes, free: {} bytes in {} blocks, \
             used: {} bytes in {} blocks, frontier: {} }}",
            self.capacity,
            self.free_bytes,
            self.free_blocks,
            self.used_bytes,
            self.used_blocks,
            self.frontier
        )
    }
}

/// One entry of the physical block listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Header offset from the pool base.
    pub offset: usize,
    /// Payload size in bytes (in-use flag masked off).
    pub size: usize,
    /// Whether the block is currently allocated.
    pub in_use: bool,
}

/// Fragmentation statistics for memory analysis
///
/// Provides insights into pool memory fragmentation, useful for monitoring
/// and optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentationStats {
    /// Total free memory across all fragments (bytes)
    pub total_free: usize,

    /// Size of the largest contiguous free payload (bytes)
    pub largest_block: usize,

    /// Number of distinct free fragments
    pub fragment_count: usize,

    /// External fragmentation ratio (0-100)
    ///
    /// Calculated as: `100 * (1 - largest_block / total_free)`
    /// High values indicate poor memory utilization.
    pub fragmentation_percent: u8,
}

impl FragmentationStats {
    /// Calculate fragmentation percentage from free space metrics
    pub fn calculate(total_free: usize, largest_block: usize, fragment_count: usize) -> Self {
        let fragmentation_percent = if total_free > 0 {
            let ratio = 1.0 - (largest_block as f64 / total_free as f64);
            (ratio * 100.0).clamp(0.0, 100.0) as u8
        } else {
            0
        };

        Self {
            total_free,
            largest_block,
            fragment_count,
            fragmentation_percent,
        }
    }

    /// Check if fragmentation is concerning (>50%)
    #[inline]
    pub fn is_fragmented(&self) -> bool {
        self.fragmentation_percent > 50
    }
}

impl fmt::Display for FragmentationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FragmentationStats {{ total_free: {} bytes, largest_block: {} bytes, \
             fragments: {}, fragmentation: {}% }}",
            self.total_free, self.largest_block, self.fragment_count, self.fragmentation_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragmentation_calculation() {
        let stats = FragmentationStats::calculate(1000, 500, 5);
        assert_eq!(stats.total_free, 1000);
        assert_eq!(stats.largest_block, 500);
        assert_eq!(stats.fragment_count, 5);
        assert_eq!(stats.fragmentation_percent, 50);

        assert!(!stats.is_fragmented()); // Exactly 50%, not >50%
    }

    #[test]
    fn test_high_fragmentation_detection() {
        let stats = FragmentationStats::calculate(1000, 100, 10);
        assert_eq!(stats.fragmentation_percent, 90);
        assert!(stats.is_fragmented());
    }

    #[test]
    fn test_zero_fragmentation() {
        let stats = FragmentationStats::default();
        assert_eq!(stats.fragmentation_percent, 0);
        assert!(!stats.is_fragmented());
    }

    #[test]
    fn test_pool_stats_display() {
        let stats = PoolStats {
            capacity: 4096,
            free_bytes: 3072,
            used_bytes: 1024,
            free_blocks: 2,
            used_blocks: 3,
            frontier: 2048,
        };
        let display = format!("{stats}");
        assert!(display.contains("4096 bytes"));
        assert!(display.contains("3 blocks"));
    }
}
