//! Common types and constants for pool management

/// Memory alignment requirements
pub mod alignment {
    /// Minimum alignment for allocations and block payloads
    ///
    /// Every payload size is rounded up to a multiple of this boundary, which
    /// keeps the low bit of the packed size word free for the in-use flag.
    pub const MIN_ALIGN: usize = 8;
}

/// Memory size constants
pub mod size {
    /// 1 Kilobyte
    pub const KB: usize = 1024;

    /// 1 Megabyte
    pub const MB: usize = 1024 * KB;

    /// Typical small pool
    pub const SMALL_POOL: usize = 64 * KB;

    /// Typical medium pool
    pub const MEDIUM_POOL: usize = MB;
}

/// Align a value up to the given alignment.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Align a value down to the given alignment.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(1, 4096), 4096);
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(0, 8), 0);
        assert_eq!(align_down(7, 8), 0);
        assert_eq!(align_down(8, 8), 8);
        assert_eq!(align_down(4097, 4096), 4096);
    }

    #[test]
    fn test_min_align_is_power_of_two() {
        assert!(alignment::MIN_ALIGN.is_power_of_two());
    }
}
