//! Index metadata stored in page 0 of every index file.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! 0       13    PageHeader (type = Meta)
//! 16      2     relation name length
//! 18      64    relation name (UTF-8, zero padded)
//! 82      4     key offset within the tuple
//! 86      1     key type (Datatype)
//! 88      4     root page id
//! 92      4     leaf capacity (L)
//! 96      4     node capacity (N)
//! ```

use crate::common::{Datatype, Error, PageId, Result};
use crate::storage::page::{PageHeader, PageType};

/// Page holding the metadata of an index file.
pub const META_PAGE_ID: PageId = PageId(0);

/// Longest relation name the metadata page can hold, in bytes.
pub const MAX_RELATION_NAME: usize = 64;

const OFFSET_NAME_LEN: usize = 16;
const OFFSET_NAME: usize = 18;
const OFFSET_KEY_OFFSET: usize = OFFSET_NAME + MAX_RELATION_NAME;
const OFFSET_KEY_TYPE: usize = 86;
const OFFSET_ROOT: usize = 88;
const OFFSET_LEAF_CAPACITY: usize = 92;
const OFFSET_NODE_CAPACITY: usize = 96;

/// Decoded contents of the metadata page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    pub relation_name: String,
    pub key_offset: usize,
    pub key_type: Datatype,
    pub root: PageId,
    pub leaf_capacity: usize,
    pub node_capacity: usize,
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn corrupt(reason: &'static str) -> Error {
    Error::CorruptNode {
        page_id: META_PAGE_ID.0,
        reason,
    }
}

impl IndexMeta {
    /// Decode the metadata page.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        if PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE]) != PageType::Meta {
            return Err(corrupt("metadata page has wrong type"));
        }

        let name_len = u16::from_le_bytes([data[OFFSET_NAME_LEN], data[OFFSET_NAME_LEN + 1]]);
        let name_len = name_len as usize;
        if name_len > MAX_RELATION_NAME {
            return Err(corrupt("relation name length out of range"));
        }
        let relation_name = std::str::from_utf8(&data[OFFSET_NAME..OFFSET_NAME + name_len])
            .map_err(|_| corrupt("relation name is not UTF-8"))?
            .to_string();

        let key_type =
            Datatype::from_u8(data[OFFSET_KEY_TYPE]).ok_or_else(|| corrupt("unknown key type"))?;

        Ok(Self {
            relation_name,
            key_offset: read_u32(data, OFFSET_KEY_OFFSET) as usize,
            key_type,
            root: PageId::from_bytes(&data[OFFSET_ROOT..]),
            leaf_capacity: read_u32(data, OFFSET_LEAF_CAPACITY) as usize,
            node_capacity: read_u32(data, OFFSET_NODE_CAPACITY) as usize,
        })
    }

    /// Format `data` as a metadata page holding `self`.
    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        let name = self.relation_name.as_bytes();
        if name.len() > MAX_RELATION_NAME {
            return Err(Error::RelationNameTooLong(name.len()));
        }
        let key_offset =
            u32::try_from(self.key_offset).map_err(|_| Error::KeyOffsetTooLarge(self.key_offset))?;

        data.fill(0);
        PageHeader::new(PageType::Meta).write_to(data);
        data[OFFSET_NAME_LEN..OFFSET_NAME_LEN + 2].copy_from_slice(&(name.len() as u16).to_le_bytes());
        data[OFFSET_NAME..OFFSET_NAME + name.len()].copy_from_slice(name);
        write_u32(data, OFFSET_KEY_OFFSET, key_offset);
        data[OFFSET_KEY_TYPE] = self.key_type as u8;
        self.root.write_to(&mut data[OFFSET_ROOT..]);
        write_u32(data, OFFSET_LEAF_CAPACITY, self.leaf_capacity as u32);
        write_u32(data, OFFSET_NODE_CAPACITY, self.node_capacity as u32);
        Ok(())
    }

    /// Overwrite only the root pointer of an existing metadata page.
    pub fn write_root(data: &mut [u8], root: PageId) {
        root.write_to(&mut data[OFFSET_ROOT..]);
    }

    /// Whether this index was built over the given relation attribute.
    pub fn matches(&self, relation_name: &str, key_offset: usize, key_type: Datatype) -> bool {
        self.relation_name == relation_name
            && self.key_offset == key_offset
            && self.key_type == key_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;

    fn sample() -> IndexMeta {
        IndexMeta {
            relation_name: "relA".to_string(),
            key_offset: 8,
            key_type: Datatype::Integer,
            root: PageId::new(1),
            leaf_capacity: 339,
            node_capacity: 508,
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut page = vec![0u8; PAGE_SIZE];
        sample().write_to(&mut page).unwrap();

        assert_eq!(IndexMeta::read_from(&page).unwrap(), sample());
        assert_eq!(&page[OFFSET_NAME..OFFSET_NAME + 4], b"relA");
        assert_eq!(page[OFFSET_KEY_TYPE], 0);
    }

    #[test]
    fn test_write_root_only_touches_root() {
        let mut page = vec![0u8; PAGE_SIZE];
        sample().write_to(&mut page).unwrap();

        IndexMeta::write_root(&mut page, PageId::new(77));

        let meta = IndexMeta::read_from(&page).unwrap();
        assert_eq!(meta.root, PageId::new(77));
        assert_eq!(meta.relation_name, "relA");
        assert_eq!(meta.node_capacity, 508);
    }

    #[test]
    fn test_name_limit() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut meta = sample();

        meta.relation_name = "x".repeat(MAX_RELATION_NAME);
        assert!(meta.write_to(&mut page).is_ok());
        assert_eq!(IndexMeta::read_from(&page).unwrap().relation_name.len(), 64);

        meta.relation_name = "x".repeat(MAX_RELATION_NAME + 1);
        assert!(matches!(
            meta.write_to(&mut page),
            Err(Error::RelationNameTooLong(65))
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_key_offset_limit() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut meta = sample();

        meta.key_offset = u32::MAX as usize;
        meta.write_to(&mut page).unwrap();
        assert_eq!(IndexMeta::read_from(&page).unwrap().key_offset, u32::MAX as usize);

        meta.key_offset = u32::MAX as usize + 5;
        assert!(matches!(
            meta.write_to(&mut page),
            Err(Error::KeyOffsetTooLarge(offset)) if offset == u32::MAX as usize + 5
        ));
    }

    #[test]
    fn test_matches() {
        let meta = sample();
        assert!(meta.matches("relA", 8, Datatype::Integer));
        assert!(!meta.matches("relB", 8, Datatype::Integer));
        assert!(!meta.matches("relA", 4, Datatype::Integer));
        assert!(!meta.matches("relA", 8, Datatype::Double));
    }

    #[test]
    fn test_wrong_page_type_rejected() {
        let mut page = vec![0u8; PAGE_SIZE];
        sample().write_to(&mut page).unwrap();
        page[PageHeader::OFFSET_PAGE_TYPE] = PageType::BTreeLeaf as u8;

        assert!(matches!(
            IndexMeta::read_from(&page),
            Err(Error::CorruptNode { page_id: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_key_type_rejected() {
        let mut page = vec![0u8; PAGE_SIZE];
        sample().write_to(&mut page).unwrap();
        page[OFFSET_KEY_TYPE] = 9;

        assert!(IndexMeta::read_from(&page).is_err());
    }
}
