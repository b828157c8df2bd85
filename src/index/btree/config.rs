//! Tunables for a B+Tree index.

use crate::common::config::{DEFAULT_POOL_SIZE, MIN_POOL_SIZE};
use crate::common::{Error, Result};

use super::node::{INTERNAL_CAPACITY, LEAF_CAPACITY};

/// Configuration applied when an index is opened or created.
///
/// Capacities only matter at creation: they are persisted in the index
/// metadata, and an existing index always keeps the capacities it was built
/// with. Smaller capacities make splits happen after a handful of inserts,
/// which is mostly useful for exercising deep trees in tests.
///
/// # Example
/// ```
/// use interchange_btree::IndexConfig;
///
/// let config = IndexConfig::default()
///     .with_pool_size(16)
///     .with_leaf_capacity(4)
///     .with_node_capacity(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Frames in the index's buffer pool.
    pub pool_size: usize,
    /// Entries per leaf (L).
    pub leaf_capacity: usize,
    /// Separator keys per internal node (N). Must be even.
    pub node_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            leaf_capacity: LEAF_CAPACITY,
            // Page-derived maximum rounded down to even.
            node_capacity: INTERNAL_CAPACITY & !1,
        }
    }
}

impl IndexConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    /// Check every field against what the page layout supports.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "pool size {} is below the minimum of {}",
                self.pool_size, MIN_POOL_SIZE
            )));
        }
        check_capacities(self.leaf_capacity, self.node_capacity)
    }
}

/// Capacity rules shared by fresh configurations and stored metadata.
pub(crate) fn check_capacities(leaf_capacity: usize, node_capacity: usize) -> Result<()> {
    if !(2..=LEAF_CAPACITY).contains(&leaf_capacity) {
        return Err(Error::InvalidConfig(format!(
            "leaf capacity {} outside 2..={}",
            leaf_capacity, LEAF_CAPACITY
        )));
    }
    if !(2..=INTERNAL_CAPACITY).contains(&node_capacity) {
        return Err(Error::InvalidConfig(format!(
            "node capacity {} outside 2..={}",
            node_capacity, INTERNAL_CAPACITY
        )));
    }
    if node_capacity % 2 != 0 {
        return Err(Error::InvalidConfig(format!(
            "node capacity {} must be even",
            node_capacity
        )));
    }
    Ok(())
}
