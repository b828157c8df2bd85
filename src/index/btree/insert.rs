//! Insertion with leaf and internal splits and root growth.
//!
//! Insertion recurses from the root on page ids only. Each level reads its
//! node, picks a child, releases the node and recurses; on the way back up a
//! child split is folded into the parent, which may split in turn. A split
//! that reaches the root grows the tree by one level.

use log::debug;

use crate::common::{PageId, RecordId, Result};

use super::index::{corrupt, BTreeIndex};
use super::meta::{IndexMeta, META_PAGE_ID};
use super::node::{InternalNode, Key, LeafNode, LEAF_PARENT_LEVEL};

/// What a subtree reports to its parent after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    NoChange,
    /// `left` split; `right` is the new node and `key` separates them.
    Split { key: Key, left: PageId, right: PageId },
}

/// Level given to internal nodes whose children are internal nodes.
const UPPER_LEVEL: u32 = 0;

impl BTreeIndex {
    /// Insert one `(key, rid)` entry. Duplicate keys are kept.
    pub fn insert_entry(&mut self, key: Key, rid: RecordId) -> Result<()> {
        match self.insert_into(self.root, key, rid)? {
            InsertOutcome::NoChange => Ok(()),
            InsertOutcome::Split { key, left, right } => self.grow_root(key, left, right),
        }
    }

    fn insert_into(&self, page_id: PageId, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        let (slot, child, level) = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let node = InternalNode::new(guard.as_slice(), self.node_capacity);
            if !node.is_valid_type() {
                return Err(corrupt(page_id, "expected internal node"));
            }
            let slot = node.insert_slot(key);
            let empty_root = page_id == self.root && node.is_empty_root();
            (slot, node.child_at(slot), if empty_root { None } else { Some(node.level()) })
        };

        let Some(level) = level else {
            self.seat_first_entry(page_id, key, rid)?;
            return Ok(InsertOutcome::NoChange);
        };
        if !child.is_valid() {
            return Err(corrupt(page_id, "separator without child"));
        }

        let outcome = if level == LEAF_PARENT_LEVEL {
            self.insert_into_leaf(child, key, rid)?
        } else {
            self.insert_into(child, key, rid)?
        };

        match outcome {
            InsertOutcome::NoChange => Ok(InsertOutcome::NoChange),
            InsertOutcome::Split { key, left, right } => {
                self.absorb_split(page_id, slot, key, left, right)
            }
        }
    }

    /// Hang the very first leaf under the empty root.
    fn seat_first_entry(&self, root: PageId, key: Key, rid: RecordId) -> Result<()> {
        let leaf_id = {
            let mut guard = self.bpm.new_page()?;
            let leaf_id = guard.page_id();
            let mut leaf = LeafNode::new(guard.as_mut_slice(), self.leaf_capacity);
            leaf.init();
            leaf.insert(key, rid);
            leaf_id
        };

        let mut guard = self.bpm.fetch_page_write(root)?;
        InternalNode::new(guard.as_mut_slice(), self.node_capacity).set_child_at(0, leaf_id);
        debug!("first leaf {} attached to root {}", leaf_id, root);
        Ok(())
    }

    fn insert_into_leaf(&self, leaf_id: PageId, key: Key, rid: RecordId) -> Result<InsertOutcome> {
        let mut guard = self.bpm.fetch_page_write(leaf_id)?;
        let mut leaf = LeafNode::new(guard.as_mut_slice(), self.leaf_capacity);
        if !leaf.is_valid_type() {
            return Err(corrupt(leaf_id, "expected leaf node"));
        }

        if !leaf.is_full() {
            leaf.insert(key, rid);
            return Ok(InsertOutcome::NoChange);
        }

        let half = leaf.num_keys() / 2;
        let split = if key < leaf.key_at(half) { half + 1 } else { half };

        let mut entries = leaf.entries();
        entries.insert(leaf.upper_bound(key), (key, rid));
        let separator = entries[split].0;

        let right_id = {
            let mut right_guard = self.bpm.new_page()?;
            let right_id = right_guard.page_id();
            let mut right = LeafNode::new(right_guard.as_mut_slice(), self.leaf_capacity);
            right.init();
            right.set_entries(&entries[split..]);
            right.set_right_sibling(leaf.right_sibling());
            right_id
        };

        leaf.set_entries(&entries[..split]);
        leaf.set_right_sibling(right_id);

        debug!(
            "split leaf {} at key {}: {} | {} entries, new leaf {}",
            leaf_id,
            separator,
            split,
            entries.len() - split,
            right_id
        );
        Ok(InsertOutcome::Split {
            key: separator,
            left: leaf_id,
            right: right_id,
        })
    }

    /// Fold a child split into the internal node `page_id`.
    ///
    /// `slot` is the child slot the insert descended through, which must
    /// still hold `left`.
    fn absorb_split(
        &self,
        page_id: PageId,
        slot: usize,
        key: Key,
        left: PageId,
        right: PageId,
    ) -> Result<InsertOutcome> {
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        let mut node = InternalNode::new(guard.as_mut_slice(), self.node_capacity);
        if node.child_at(slot) != left {
            return Err(corrupt(page_id, "split child not at its routing slot"));
        }

        if !node.is_full() {
            node.insert_at(slot, key, right);
            return Ok(InsertOutcome::NoChange);
        }

        let mut keys = node.keys();
        let mut children = node.children();
        keys.insert(slot, key);
        children.insert(slot + 1, right);

        let mid = keys.len() / 2;
        let promoted = keys[mid];
        let level = node.level();

        let sibling_id = {
            let mut sibling_guard = self.bpm.new_page()?;
            let sibling_id = sibling_guard.page_id();
            let mut sibling = InternalNode::new(sibling_guard.as_mut_slice(), self.node_capacity);
            sibling.init(level);
            sibling.set_contents(&keys[mid + 1..], &children[mid + 1..]);
            sibling_id
        };

        node.set_contents(&keys[..mid], &children[..=mid]);

        debug!(
            "split internal node {} (level {}) promoting {}, new node {}",
            page_id, level, promoted, sibling_id
        );
        Ok(InsertOutcome::Split {
            key: promoted,
            left: page_id,
            right: sibling_id,
        })
    }

    /// Put a new root above a split root and record it in the metadata.
    fn grow_root(&mut self, key: Key, left: PageId, right: PageId) -> Result<()> {
        let new_root = {
            let mut guard = self.bpm.new_page()?;
            let new_root = guard.page_id();
            let mut node = InternalNode::new(guard.as_mut_slice(), self.node_capacity);
            node.init(UPPER_LEVEL);
            node.set_contents(&[key], &[left, right]);
            new_root
        };

        {
            let mut guard = self.bpm.fetch_page_write(META_PAGE_ID)?;
            IndexMeta::write_root(guard.as_mut_slice(), new_root);
        }

        debug!("root {} split, new root {} over {} | {}", self.root, new_root, left, right);
        self.root = new_root;
        Ok(())
    }
}
