//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. Pages live in [`Frame`](crate::buffer::Frame)s
//! of the buffer pool; index nodes and relation pages are typed views over
//! their bytes.

use crate::common::config::PAGE_SIZE;

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// `Page` does not implement `Clone` outside tests: copying a page should be
/// an explicit `copy_from_slice`.
///
/// # Example
/// ```
/// use interchange_btree::storage::page::{Page, PageType};
///
/// let mut page = Page::new();
/// page.init(PageType::BTreeLeaf);
/// assert_eq!(page.page_type(), PageType::BTreeLeaf);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Zero the page and stamp a fresh header of the given type.
    pub fn init(&mut self, page_type: PageType) {
        self.reset();
        PageHeader::new(page_type).write_to(&mut self.data);
    }

    /// Type recorded in the page header.
    #[inline]
    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[PageHeader::OFFSET_PAGE_TYPE])
    }

    /// Whether the header carries the given type.
    #[inline]
    pub fn is_type(&self, page_type: PageType) -> bool {
        self.page_type() == page_type
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Compute and store checksum in the header.
    ///
    /// Called by the buffer pool right before the page is written back.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum.
    ///
    /// Pages that were never initialized (type `Invalid`, all zeros) carry no
    /// checksum and are accepted as-is.
    pub fn verify_checksum(&self) -> bool {
        let header = self.header();
        header.page_type == PageType::Invalid || header.verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_init_clears_previous_content() {
        let mut page = Page::new();
        page.as_mut_slice()[100] = 0xAB;

        page.init(PageType::BTreeInternal);

        assert_eq!(page.page_type(), PageType::BTreeInternal);
        assert_eq!(page.as_slice()[100], 0);
    }

    #[test]
    fn test_page_checksum_roundtrip() {
        let mut page = Page::new();
        page.init(PageType::BTreeLeaf);
        page.as_mut_slice()[500] = 0x42;
        page.update_checksum();
        assert!(page.verify_checksum());

        let mut corrupted = page.clone();
        corrupted.as_mut_slice()[500] = 0x43;
        assert!(!corrupted.verify_checksum());
    }

    #[test]
    fn test_zero_page_passes_verification() {
        let page = Page::new();
        assert_eq!(page.page_type(), PageType::Invalid);
        assert!(page.verify_checksum());
    }
}
