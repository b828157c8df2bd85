//! Typed views over B+Tree node pages.
//!
//! A node is never copied out of the buffer pool: [`InternalNode`] and
//! [`LeafNode`] wrap the byte slice of a pinned page guard, so the view lives
//! exactly as long as the pin. Read-only accessors work on any
//! `AsRef<[u8]>`; mutators additionally need `AsMut<[u8]>`.
//!
//! Both node kinds keep fixed-size arrays plus an explicit used count. Slots
//! beyond the used count hold zero keys and `PageId::INVALID` links, and are
//! never read as data.
//!
//! # Internal node layout
//! ```text
//! Offset              Size        Field
//! 0                   13          PageHeader (type = BTreeInternal)
//! 16                  4           level (1 = children are leaves)
//! 20                  4           num_keys
//! 24                  4 * N_MAX   keys
//! 24 + 4 * N_MAX      4 * N_MAX+4 children
//! ```
//!
//! # Leaf node layout
//! ```text
//! Offset              Size        Field
//! 0                   13          PageHeader (type = BTreeLeaf)
//! 16                  4           num_keys
//! 20                  4           right sibling
//! 24                  4 * L_MAX   keys
//! 24 + 4 * L_MAX      8 * L_MAX   record ids
//! ```
//!
//! The arrays are laid out for the page-derived maxima; an index created with
//! smaller capacities simply uses a prefix of each array.

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, RecordId};
use crate::storage::page::{PageHeader, PageType};

/// Key type of the index.
pub type Key = i32;

/// Width of an encoded key.
pub const KEY_SIZE: usize = std::mem::size_of::<Key>();

const OFFSET_ARRAYS: usize = 24;

const OFFSET_LEVEL: usize = 16;
const OFFSET_INTERNAL_NUM_KEYS: usize = 20;

/// Most separator keys an internal page can hold (N).
pub const INTERNAL_CAPACITY: usize =
    (PAGE_SIZE - OFFSET_ARRAYS - PageId::SIZE) / (KEY_SIZE + PageId::SIZE);
const OFFSET_CHILDREN: usize = OFFSET_ARRAYS + INTERNAL_CAPACITY * KEY_SIZE;

pub(super) const OFFSET_LEAF_NUM_KEYS: usize = 16;
const OFFSET_RIGHT_SIBLING: usize = 20;

/// Most entries a leaf page can hold (L).
pub const LEAF_CAPACITY: usize = (PAGE_SIZE - OFFSET_ARRAYS) / (KEY_SIZE + RecordId::SIZE);
const OFFSET_RIDS: usize = OFFSET_ARRAYS + LEAF_CAPACITY * KEY_SIZE;

/// Level of an internal node whose children are leaves.
pub const LEAF_PARENT_LEVEL: u32 = 1;

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn read_key(data: &[u8], index: usize) -> Key {
    read_u32(data, OFFSET_ARRAYS + index * KEY_SIZE) as Key
}

#[inline]
fn write_key(data: &mut [u8], index: usize, key: Key) {
    let offset = OFFSET_ARRAYS + index * KEY_SIZE;
    data[offset..offset + KEY_SIZE].copy_from_slice(&key.to_le_bytes());
}

fn page_type(data: &[u8]) -> PageType {
    PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE])
}

// ============================================================================
// Internal nodes
// ============================================================================

/// View of an internal (non-leaf) node.
///
/// With used keys `k0 < k1 < … < k(m-1)`, child `i` covers keys in
/// `[k(i-1), k(i)]`, open at both extremes; equal keys may sit on either side
/// of a separator equal to them.
pub struct InternalNode<T> {
    data: T,
    capacity: usize,
}

impl<T: AsRef<[u8]>> InternalNode<T> {
    /// Wrap page bytes, treating at most `capacity` keys as usable.
    pub fn new(data: T, capacity: usize) -> Self {
        debug_assert!(capacity <= INTERNAL_CAPACITY);
        Self { data, capacity }
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Whether the page header marks this page as an internal node.
    pub fn is_valid_type(&self) -> bool {
        page_type(self.bytes()) == PageType::BTreeInternal
    }

    pub fn level(&self) -> u32 {
        read_u32(self.bytes(), OFFSET_LEVEL)
    }

    pub fn num_keys(&self) -> usize {
        read_u32(self.bytes(), OFFSET_INTERNAL_NUM_KEYS) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.num_keys() >= self.capacity
    }

    pub fn key_at(&self, index: usize) -> Key {
        read_key(self.bytes(), index)
    }

    pub fn child_at(&self, index: usize) -> PageId {
        PageId::from_bytes(&self.bytes()[OFFSET_CHILDREN + index * PageId::SIZE..])
    }

    /// Used keys, in order.
    pub fn keys(&self) -> Vec<Key> {
        (0..self.num_keys()).map(|i| self.key_at(i)).collect()
    }

    /// Used children, in order (one more than the used keys).
    pub fn children(&self) -> Vec<PageId> {
        (0..=self.num_keys()).map(|i| self.child_at(i)).collect()
    }

    /// The freshly created root before anything has been inserted.
    pub fn is_empty_root(&self) -> bool {
        self.num_keys() == 0 && !self.child_at(0).is_valid()
    }

    /// Child slot for inserting `key`: the first separator strictly greater
    /// than `key` picks its left child, otherwise the last used child.
    pub fn insert_slot(&self, key: Key) -> usize {
        let n = self.num_keys();
        (0..n).find(|&i| self.key_at(i) > key).unwrap_or(n)
    }

    /// Child slot for seeking the first entry `>= key`: equal separators route
    /// left, since duplicates of a separator may remain in its left subtree.
    pub fn seek_slot(&self, key: Key) -> usize {
        let n = self.num_keys();
        (0..n).find(|&i| self.key_at(i) >= key).unwrap_or(n)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> InternalNode<T> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Format the page as an empty internal node at `level`.
    pub fn init(&mut self, level: u32) {
        let data = self.bytes_mut();
        data.fill(0);
        PageHeader::new(PageType::BTreeInternal).write_to(data);
        write_u32(data, OFFSET_LEVEL, level);
        for i in 0..=INTERNAL_CAPACITY {
            PageId::INVALID.write_to(&mut data[OFFSET_CHILDREN + i * PageId::SIZE..]);
        }
    }

    fn set_num_keys(&mut self, n: usize) {
        write_u32(self.bytes_mut(), OFFSET_INTERNAL_NUM_KEYS, n as u32);
    }

    pub fn set_child_at(&mut self, index: usize, child: PageId) {
        child.write_to(&mut self.bytes_mut()[OFFSET_CHILDREN + index * PageId::SIZE..]);
    }

    /// Insert `key` at `slot` with `right` as the child just after it.
    ///
    /// Keys from `slot` and children from `slot + 1` shift one place right;
    /// the child at `slot` (the one that split) stays put.
    ///
    /// # Panics
    /// Panics in debug builds if the node is full.
    pub fn insert_at(&mut self, slot: usize, key: Key, right: PageId) {
        let n = self.num_keys();
        debug_assert!(n < self.capacity, "insert into full internal node");
        debug_assert!(slot <= n);

        for i in (slot..n).rev() {
            let k = self.key_at(i);
            write_key(self.bytes_mut(), i + 1, k);
        }
        for i in (slot + 1..=n).rev() {
            let c = self.child_at(i);
            self.set_child_at(i + 1, c);
        }
        write_key(self.bytes_mut(), slot, key);
        self.set_child_at(slot + 1, right);
        self.set_num_keys(n + 1);
    }

    /// Replace the node contents; unused slots are reset to sentinels.
    ///
    /// # Panics
    /// Panics if `children.len() != keys.len() + 1` or the keys overflow the
    /// node.
    pub fn set_contents(&mut self, keys: &[Key], children: &[PageId]) {
        assert_eq!(children.len(), keys.len() + 1, "fan-out mismatch");
        assert!(keys.len() <= self.capacity, "internal node overflow");

        for i in 0..INTERNAL_CAPACITY {
            write_key(self.bytes_mut(), i, keys.get(i).copied().unwrap_or(0));
        }
        for i in 0..=INTERNAL_CAPACITY {
            let child = children.get(i).copied().unwrap_or(PageId::INVALID);
            self.set_child_at(i, child);
        }
        self.set_num_keys(keys.len());
    }
}

// ============================================================================
// Leaf nodes
// ============================================================================

/// View of a leaf node: sorted keys, their record ids and a right link.
pub struct LeafNode<T> {
    data: T,
    capacity: usize,
}

impl<T: AsRef<[u8]>> LeafNode<T> {
    /// Wrap page bytes, treating at most `capacity` entries as usable.
    pub fn new(data: T, capacity: usize) -> Self {
        debug_assert!(capacity <= LEAF_CAPACITY);
        Self { data, capacity }
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Whether the page header marks this page as a leaf.
    pub fn is_valid_type(&self) -> bool {
        page_type(self.bytes()) == PageType::BTreeLeaf
    }

    pub fn num_keys(&self) -> usize {
        read_u32(self.bytes(), OFFSET_LEAF_NUM_KEYS) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.num_keys() >= self.capacity
    }

    pub fn key_at(&self, index: usize) -> Key {
        read_key(self.bytes(), index)
    }

    pub fn rid_at(&self, index: usize) -> RecordId {
        RecordId::from_bytes(&self.bytes()[OFFSET_RIDS + index * RecordId::SIZE..])
    }

    /// Next leaf in key order, `PageId::INVALID` for the rightmost leaf.
    pub fn right_sibling(&self) -> PageId {
        PageId::from_bytes(&self.bytes()[OFFSET_RIGHT_SIBLING..])
    }

    /// Used entries, in order.
    pub fn entries(&self) -> Vec<(Key, RecordId)> {
        (0..self.num_keys())
            .map(|i| (self.key_at(i), self.rid_at(i)))
            .collect()
    }

    /// First slot whose key is `>= key`, or `num_keys()` if there is none.
    pub fn lower_bound(&self, key: Key) -> usize {
        let n = self.num_keys();
        (0..n).find(|&i| self.key_at(i) >= key).unwrap_or(n)
    }

    /// First slot whose key is `> key`, or `num_keys()` if there is none.
    pub fn upper_bound(&self, key: Key) -> usize {
        let n = self.num_keys();
        (0..n).find(|&i| self.key_at(i) > key).unwrap_or(n)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> LeafNode<T> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Format the page as an empty, rightmost leaf.
    pub fn init(&mut self) {
        let data = self.bytes_mut();
        data.fill(0);
        PageHeader::new(PageType::BTreeLeaf).write_to(data);
        PageId::INVALID.write_to(&mut data[OFFSET_RIGHT_SIBLING..]);
    }

    fn set_num_keys(&mut self, n: usize) {
        write_u32(self.bytes_mut(), OFFSET_LEAF_NUM_KEYS, n as u32);
    }

    fn write_entry(&mut self, index: usize, key: Key, rid: RecordId) {
        write_key(self.bytes_mut(), index, key);
        rid.write_to(&mut self.bytes_mut()[OFFSET_RIDS + index * RecordId::SIZE..]);
    }

    pub fn set_right_sibling(&mut self, sibling: PageId) {
        sibling.write_to(&mut self.bytes_mut()[OFFSET_RIGHT_SIBLING..]);
    }

    /// Ordered-shift insert. Equal keys keep their arrival order: the new
    /// entry lands after any entry with the same key.
    ///
    /// # Panics
    /// Panics in debug builds if the leaf is full.
    pub fn insert(&mut self, key: Key, rid: RecordId) {
        let n = self.num_keys();
        debug_assert!(n < self.capacity, "insert into full leaf");

        let slot = self.upper_bound(key);
        for i in (slot..n).rev() {
            let (k, r) = (self.key_at(i), self.rid_at(i));
            self.write_entry(i + 1, k, r);
        }
        self.write_entry(slot, key, rid);
        self.set_num_keys(n + 1);
    }

    /// Replace the leaf entries; unused slots are zeroed.
    ///
    /// # Panics
    /// Panics if `entries` does not fit the leaf.
    pub fn set_entries(&mut self, entries: &[(Key, RecordId)]) {
        assert!(entries.len() <= self.capacity, "leaf overflow");

        for (i, &(key, rid)) in entries.iter().enumerate() {
            self.write_entry(i, key, rid);
        }
        let data = self.bytes_mut();
        data[OFFSET_ARRAYS + entries.len() * KEY_SIZE..OFFSET_RIDS].fill(0);
        data[OFFSET_RIDS + entries.len() * RecordId::SIZE
            ..OFFSET_RIDS + LEAF_CAPACITY * RecordId::SIZE]
            .fill(0);
        self.set_num_keys(entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(n: u32) -> RecordId {
        RecordId::new(PageId::new(n), (n % 7) as u16)
    }

    #[test]
    fn test_capacities_fit_page() {
        assert_eq!(INTERNAL_CAPACITY, 508);
        assert_eq!(LEAF_CAPACITY, 339);
        assert!(OFFSET_CHILDREN + (INTERNAL_CAPACITY + 1) * PageId::SIZE <= PAGE_SIZE);
        assert!(OFFSET_RIDS + LEAF_CAPACITY * RecordId::SIZE <= PAGE_SIZE);
        assert!(OFFSET_ARRAYS >= PageHeader::SIZE + 8);
    }

    #[test]
    fn test_leaf_init() {
        let mut page = vec![0xAAu8; PAGE_SIZE];
        let mut leaf = LeafNode::new(page.as_mut_slice(), 4);
        leaf.init();

        assert!(leaf.is_valid_type());
        assert_eq!(leaf.num_keys(), 0);
        assert!(!leaf.right_sibling().is_valid());
        assert!(!leaf.is_full());
    }

    #[test]
    fn test_leaf_ordered_insert() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(page.as_mut_slice(), 8);
        leaf.init();

        for k in [50, 10, 30, 20, 40] {
            leaf.insert(k, rid(k as u32));
        }

        let keys: Vec<Key> = leaf.entries().iter().map(|e| e.0).collect();
        assert_eq!(keys, vec![10, 20, 30, 40, 50]);
        assert_eq!(leaf.rid_at(2), rid(30));
    }

    #[test]
    fn test_leaf_duplicates_stay_contiguous_in_arrival_order() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(page.as_mut_slice(), 8);
        leaf.init();

        leaf.insert(5, rid(1));
        leaf.insert(9, rid(2));
        leaf.insert(5, rid(3));
        leaf.insert(1, rid(4));

        assert_eq!(
            leaf.entries(),
            vec![(1, rid(4)), (5, rid(1)), (5, rid(3)), (9, rid(2))]
        );
        assert_eq!(leaf.lower_bound(5), 1);
        assert_eq!(leaf.upper_bound(5), 3);
        assert_eq!(leaf.lower_bound(10), 4);
    }

    #[test]
    fn test_leaf_negative_keys() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(page.as_mut_slice(), 4);
        leaf.init();

        leaf.insert(0, rid(0));
        leaf.insert(Key::MIN, rid(1));
        leaf.insert(-3, rid(2));

        let keys: Vec<Key> = leaf.entries().iter().map(|e| e.0).collect();
        assert_eq!(keys, vec![Key::MIN, -3, 0]);
    }

    #[test]
    fn test_leaf_set_entries_clears_tail() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(page.as_mut_slice(), 4);
        leaf.init();
        for k in 1..=4 {
            leaf.insert(k, rid(k as u32));
        }
        assert!(leaf.is_full());

        leaf.set_entries(&[(1, rid(1)), (2, rid(2))]);

        assert_eq!(leaf.num_keys(), 2);
        assert_eq!(leaf.key_at(2), 0);
        assert_eq!(leaf.rid_at(3), RecordId::new(PageId::new(0), 0));
    }

    #[test]
    fn test_leaf_read_only_view() {
        let mut page = vec![0u8; PAGE_SIZE];
        {
            let mut leaf = LeafNode::new(page.as_mut_slice(), 4);
            leaf.init();
            leaf.insert(3, rid(3));
            leaf.set_right_sibling(PageId::new(12));
        }

        let leaf = LeafNode::new(page.as_slice(), 4);
        assert_eq!(leaf.entries(), vec![(3, rid(3))]);
        assert_eq!(leaf.right_sibling(), PageId::new(12));
    }

    #[test]
    fn test_internal_init() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::new(page.as_mut_slice(), 4);
        node.init(LEAF_PARENT_LEVEL);

        assert!(node.is_valid_type());
        assert_eq!(node.level(), 1);
        assert!(node.is_empty_root());
        assert_eq!(node.insert_slot(42), 0);
        assert!(!node.child_at(INTERNAL_CAPACITY).is_valid());
    }

    #[test]
    fn test_internal_insert_at_keeps_split_child_left() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::new(page.as_mut_slice(), 4);
        node.init(LEAF_PARENT_LEVEL);
        node.set_contents(&[10, 30], &[PageId::new(1), PageId::new(2), PageId::new(3)]);

        // Child 2 (keys in [10, 30]) split at 20 into 2 and 9.
        node.insert_at(1, 20, PageId::new(9));

        assert_eq!(node.keys(), vec![10, 20, 30]);
        assert_eq!(
            node.children(),
            vec![PageId::new(1), PageId::new(2), PageId::new(9), PageId::new(3)]
        );
    }

    #[test]
    fn test_internal_routing() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::new(page.as_mut_slice(), 4);
        node.init(LEAF_PARENT_LEVEL);
        node.set_contents(&[10, 20], &[PageId::new(1), PageId::new(2), PageId::new(3)]);

        assert_eq!(node.insert_slot(5), 0);
        assert_eq!(node.insert_slot(10), 1);
        assert_eq!(node.insert_slot(15), 1);
        assert_eq!(node.insert_slot(20), 2);
        assert_eq!(node.insert_slot(99), 2);

        assert_eq!(node.seek_slot(10), 0);
        assert_eq!(node.seek_slot(11), 1);
        assert_eq!(node.seek_slot(20), 1);
        assert_eq!(node.seek_slot(21), 2);
    }

    #[test]
    fn test_internal_set_contents_resets_unused_children() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::new(page.as_mut_slice(), 4);
        node.init(0);
        node.set_contents(
            &[1, 2, 3, 4],
            &[
                PageId::new(1),
                PageId::new(2),
                PageId::new(3),
                PageId::new(4),
                PageId::new(5),
            ],
        );
        assert!(node.is_full());

        node.set_contents(&[2], &[PageId::new(1), PageId::new(2)]);

        assert_eq!(node.num_keys(), 1);
        assert_eq!(node.key_at(1), 0);
        assert!(!node.child_at(2).is_valid());
        assert_eq!(node.level(), 0);
    }

    #[test]
    #[should_panic(expected = "fan-out mismatch")]
    fn test_internal_set_contents_rejects_bad_fanout() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::new(page.as_mut_slice(), 4);
        node.init(0);
        node.set_contents(&[1, 2], &[PageId::new(1), PageId::new(2)]);
    }
}
