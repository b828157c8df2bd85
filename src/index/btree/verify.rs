//! Structural self-check of a whole tree.

use log::debug;

use crate::common::{PageId, Result};

use super::index::{corrupt, BTreeIndex};
use super::node::{InternalNode, Key, LeafNode, LEAF_PARENT_LEVEL};

/// Summary of a tree that passed [`BTreeIndex::check_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels from the root down to the leaves, both included. An empty
    /// tree (root only) has height 1.
    pub height: usize,
    pub leaf_count: usize,
    pub entry_count: usize,
    pub root_keys: usize,
}

#[derive(Default)]
struct Walk {
    leaf_depth: Option<usize>,
    /// Leaves in key order with their stored right links.
    leaves: Vec<(PageId, PageId)>,
    entries: usize,
}

/// Keys a subtree may hold, both ends inclusive.
#[derive(Clone, Copy)]
struct Bounds {
    low: Option<Key>,
    high: Option<Key>,
}

impl Bounds {
    fn contains(&self, key: Key) -> bool {
        self.low.map_or(true, |low| key >= low) && self.high.map_or(true, |high| key <= high)
    }
}

impl BTreeIndex {
    /// Walk the whole tree and verify its invariants.
    ///
    /// Checks node types, fan-out of every non-root internal node, key order
    /// inside nodes and against the separators above them, equal depth of all
    /// leaves, and that the right links chain the leaves in key order.
    ///
    /// # Errors
    /// `Error::CorruptNode` naming the first page found at fault.
    pub fn check_integrity(&self) -> Result<TreeShape> {
        let mut walk = Walk::default();
        let root_keys = self.check_internal(
            self.root,
            Bounds {
                low: None,
                high: None,
            },
            true,
            1,
            &mut walk,
        )?;

        for pair in walk.leaves.windows(2) {
            let ((leaf, link), (next, _)) = (pair[0], pair[1]);
            if link != next {
                return Err(corrupt(leaf, "right link skips a leaf"));
            }
        }
        if let Some(&(last, link)) = walk.leaves.last() {
            if link.is_valid() {
                return Err(corrupt(last, "rightmost leaf has a right link"));
            }
        }

        let shape = TreeShape {
            height: walk.leaf_depth.unwrap_or(1),
            leaf_count: walk.leaves.len(),
            entry_count: walk.entries,
            root_keys,
        };
        debug!("integrity check passed: {:?}", shape);
        Ok(shape)
    }

    /// Returns the number of keys in the node.
    fn check_internal(
        &self,
        page_id: PageId,
        bounds: Bounds,
        is_root: bool,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<usize> {
        let (level, keys, children) = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let node = InternalNode::new(guard.as_slice(), self.node_capacity);
            if !node.is_valid_type() {
                return Err(corrupt(page_id, "expected internal node"));
            }
            if node.num_keys() > self.node_capacity {
                return Err(corrupt(page_id, "key count above capacity"));
            }
            if is_root && node.is_empty_root() {
                return Ok(0);
            }
            (node.level(), node.keys(), node.children())
        };

        if !is_root && keys.len() < self.node_capacity / 2 {
            return Err(corrupt(page_id, "internal node underfull"));
        }
        if keys.windows(2).any(|w| w[0] > w[1]) {
            return Err(corrupt(page_id, "keys out of order"));
        }
        if !keys.iter().all(|&k| bounds.contains(k)) {
            return Err(corrupt(page_id, "key outside parent separators"));
        }

        for (i, &child) in children.iter().enumerate() {
            if !child.is_valid() {
                return Err(corrupt(page_id, "missing child"));
            }
            let child_bounds = Bounds {
                low: if i == 0 { bounds.low } else { Some(keys[i - 1]) },
                high: keys.get(i).copied().or(bounds.high),
            };
            if level == LEAF_PARENT_LEVEL {
                self.check_leaf(child, child_bounds, depth + 1, walk)?;
            } else {
                self.check_internal(child, child_bounds, false, depth + 1, walk)?;
            }
        }

        Ok(keys.len())
    }

    fn check_leaf(&self, page_id: PageId, bounds: Bounds, depth: usize, walk: &mut Walk) -> Result<()> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        let leaf = LeafNode::new(guard.as_slice(), self.leaf_capacity);
        if !leaf.is_valid_type() {
            return Err(corrupt(page_id, "expected leaf node"));
        }

        let n = leaf.num_keys();
        if n == 0 || n > self.leaf_capacity {
            return Err(corrupt(page_id, "leaf entry count out of range"));
        }
        let keys: Vec<Key> = (0..n).map(|i| leaf.key_at(i)).collect();
        if keys.windows(2).any(|w| w[0] > w[1]) {
            return Err(corrupt(page_id, "leaf keys out of order"));
        }
        if !keys.iter().all(|&k| bounds.contains(k)) {
            return Err(corrupt(page_id, "leaf key outside parent separators"));
        }

        match walk.leaf_depth {
            Some(d) if d != depth => return Err(corrupt(page_id, "leaves at unequal depth")),
            _ => walk.leaf_depth = Some(depth),
        }
        walk.leaves.push((page_id, leaf.right_sibling()));
        walk.entries += n;
        Ok(())
    }
}
