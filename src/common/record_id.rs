//! Record locator type.

use std::fmt;

use super::PageId;

/// Identifies a tuple inside a relation file: the page holding it and its slot.
///
/// Index leaves store one `RecordId` per key. On a page it takes 8 bytes:
/// the page number (u32), the slot number (u16) and two bytes of padding.
///
/// # Example
/// ```
/// use interchange_btree::{PageId, RecordId};
///
/// let rid = RecordId::new(PageId::new(3), 7);
/// assert_eq!(rid.page_number, PageId::new(3));
/// assert_eq!(rid.slot_number, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_number: PageId,
    pub slot_number: u16,
}

impl RecordId {
    /// Encoded width inside a page.
    pub const SIZE: usize = 8;

    /// Create a new RecordId.
    #[inline]
    pub fn new(page_number: PageId, slot_number: u16) -> Self {
        Self {
            page_number,
            slot_number,
        }
    }

    /// Read a locator from the first [`RecordId::SIZE`] bytes of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let page = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let slot = u16::from_le_bytes([data[4], data[5]]);
        Self::new(PageId::new(page), slot)
    }

    /// Write this locator into the first [`RecordId::SIZE`] bytes of `data`.
    pub fn write_to(&self, data: &mut [u8]) {
        data[0..4].copy_from_slice(&self.page_number.0.to_le_bytes());
        data[4..6].copy_from_slice(&self.slot_number.to_le_bytes());
        data[6..8].fill(0);
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_number.0, self.slot_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_byte_layout() {
        let rid = RecordId::new(PageId::new(0x04030201), 0x0605);
        let mut buf = [0xFFu8; RecordId::SIZE];
        rid.write_to(&mut buf);

        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0]);
        assert_eq!(RecordId::from_bytes(&buf), rid);
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(format!("{}", RecordId::new(PageId::new(2), 9)), "Rid(2, 9)");
    }
}
