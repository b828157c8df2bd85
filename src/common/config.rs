//! Configuration constants shared by the page store and the index.

/// Size of a page in bytes (4KB).
///
/// Node capacities of the B+Tree are derived from this value, so changing it
/// changes the on-disk format of every index file.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical file size in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

/// Frames given to a buffer pool when the caller does not choose.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Fewest frames an index can operate with.
///
/// An insert holds a node and its freshly split sibling at the same time,
/// and a scan keeps one more leaf pinned across calls.
pub const MIN_POOL_SIZE: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_max_db_size() {
        // 16TB = 16 * 1024^4 bytes
        let expected = 16 * 1024u64 * 1024 * 1024 * 1024;
        assert_eq!(MAX_DB_SIZE_BYTES, expected);
    }

    #[test]
    fn test_default_pool_fits_minimum() {
        assert!(DEFAULT_POOL_SIZE >= MIN_POOL_SIZE);
    }
}
