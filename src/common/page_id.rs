//! Page identifier type.

use std::fmt;

/// Identifies a page on disk.
///
/// Using `u32` allows for 4 billion pages:
/// - 4,294,967,296 pages × 4KB = 16TB maximum database size
///
/// Index nodes store child and sibling links as raw `u32` page numbers,
/// with [`PageId::INVALID`] marking an absent link.
///
/// # Example
/// ```
/// use interchange_btree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Used to represent "no page" or uninitialized state.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Encoded width of a page link inside a node.
    pub const SIZE: usize = 4;

    /// Read a page link stored little-endian at the start of `data`.
    #[inline]
    pub fn from_bytes(data: &[u8]) -> Self {
        PageId(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Store this page link little-endian at the start of `data`.
    #[inline]
    pub fn write_to(&self, data: &mut [u8]) {
        data[..Self::SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
        assert!(pid.is_valid());
    }

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(1) < PageId::new(2));
        assert!(PageId::new(5) > PageId::new(3));
    }

    #[test]
    fn test_page_id_link_encoding() {
        let mut buf = [0u8; 6];
        PageId::new(0x0A0B0C0D).write_to(&mut buf[1..]);
        assert_eq!(&buf[1..5], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(PageId::from_bytes(&buf[1..]), PageId::new(0x0A0B0C0D));

        PageId::INVALID.write_to(&mut buf);
        assert!(!PageId::from_bytes(&buf).is_valid());
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }
}