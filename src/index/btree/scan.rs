//! Range scan cursor.
//!
//! A scan walks the leaf chain from the first entry inside the range and
//! stops at the first key above it. While the scan is active the current
//! leaf stays pinned through an explicit pin, so no guard borrows the index
//! between calls.
//!
//! ```text
//!            start_scan            key > high / chain ends
//!   Idle ──────────────▶ Active ─────────────────────────▶ Exhausted
//!    ▲                     │                                    │
//!    └──────── end_scan ───┴────────────── end_scan ────────────┘
//! ```

use log::debug;

use crate::common::{Error, PageId, RecordId, Result};

use super::index::{corrupt, BTreeIndex};
use super::node::{Key, LeafNode};

/// Comparison applied to a scan bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum ScanState {
    #[default]
    Idle,
    /// `leaf` is pinned; `slot` is the next entry to look at.
    Active { leaf: PageId, slot: usize, high: Key },
    /// Started, but nothing more to return.
    Exhausted,
}

/// Inclusive lower bound, `None` if `> value` leaves nothing.
fn normalize_low(value: Key, op: Operator) -> Result<Option<Key>> {
    match op {
        Operator::GreaterThanOrEqual => Ok(Some(value)),
        Operator::GreaterThan => Ok(value.checked_add(1)),
        _ => Err(Error::InvalidOperator),
    }
}

/// Inclusive upper bound, `None` if `< value` leaves nothing.
fn normalize_high(value: Key, op: Operator) -> Result<Option<Key>> {
    match op {
        Operator::LessThanOrEqual => Ok(Some(value)),
        Operator::LessThan => Ok(value.checked_sub(1)),
        _ => Err(Error::InvalidOperator),
    }
}

impl BTreeIndex {
    /// Start a scan over the keys between `low_value` and `high_value`.
    ///
    /// `low_op` must be `GreaterThan` or `GreaterThanOrEqual`, `high_op` must
    /// be `LessThan` or `LessThanOrEqual`. Bounds are checked before any page
    /// is touched. A scan that is already running is ended first.
    ///
    /// # Errors
    /// - `Error::InvalidOperator` for a misplaced operator
    /// - `Error::InvalidRange` if `low_value > high_value`
    pub fn start_scan(
        &mut self,
        low_value: Key,
        low_op: Operator,
        high_value: Key,
        high_op: Operator,
    ) -> Result<()> {
        let low = normalize_low(low_value, low_op)?;
        let high = normalize_high(high_value, high_op)?;
        if low_value > high_value {
            return Err(Error::InvalidRange {
                low: low_value,
                high: high_value,
            });
        }

        self.release_scan()?;

        let (low, high) = match (low, high) {
            (Some(low), Some(high)) if low <= high => (low, high),
            _ => {
                debug!("scan {:?} {} .. {:?} {} is empty", low_op, low_value, high_op, high_value);
                self.scan = ScanState::Exhausted;
                return Ok(());
            }
        };

        let landing = match self.descend_to_leaf(low)? {
            Some((guard, slot)) => {
                let leaf = guard.page_id();
                self.bpm.pin_page(leaf)?;
                Some((leaf, slot))
            }
            None => None,
        };

        self.scan = match landing {
            Some((leaf, slot)) => ScanState::Active { leaf, slot, high },
            None => ScanState::Exhausted,
        };
        debug!("scan started over [{}, {}]: {:?}", low, high, self.scan);
        Ok(())
    }

    /// Return the next matching record id in key order.
    ///
    /// # Errors
    /// - `Error::ScanNotActive` if no scan was started
    /// - `Error::ScanComplete` once the range is used up
    pub fn scan_next(&mut self) -> Result<RecordId> {
        loop {
            let (leaf_id, slot, high) = match self.scan {
                ScanState::Idle => return Err(Error::ScanNotActive),
                ScanState::Exhausted => return Err(Error::ScanComplete),
                ScanState::Active { leaf, slot, high } => (leaf, slot, high),
            };

            let (entry, sibling) = {
                let guard = self.bpm.fetch_page_read(leaf_id)?;
                let leaf = LeafNode::new(guard.as_slice(), self.leaf_capacity);
                if !leaf.is_valid_type() {
                    return Err(corrupt(leaf_id, "scan left the leaf level"));
                }
                if leaf.num_keys() > self.leaf_capacity {
                    return Err(corrupt(leaf_id, "leaf entry count above capacity"));
                }
                let entry = (slot < leaf.num_keys()).then(|| (leaf.key_at(slot), leaf.rid_at(slot)));
                (entry, leaf.right_sibling())
            };

            match entry {
                Some((key, _)) if key > high => {
                    self.finish_scan(leaf_id)?;
                    return Err(Error::ScanComplete);
                }
                Some((_, rid)) => {
                    self.scan = ScanState::Active {
                        leaf: leaf_id,
                        slot: slot + 1,
                        high,
                    };
                    return Ok(rid);
                }
                None if !sibling.is_valid() => {
                    self.finish_scan(leaf_id)?;
                    return Err(Error::ScanComplete);
                }
                None => {
                    self.bpm.unpin_page(leaf_id, false)?;
                    self.scan = ScanState::Exhausted;
                    self.bpm.pin_page(sibling)?;
                    self.scan = ScanState::Active {
                        leaf: sibling,
                        slot: 0,
                        high,
                    };
                }
            }
        }
    }

    /// End the current scan and release its leaf.
    ///
    /// # Errors
    /// `Error::ScanNotActive` if no scan was started.
    pub fn end_scan(&mut self) -> Result<()> {
        if self.scan == ScanState::Idle {
            return Err(Error::ScanNotActive);
        }
        self.release_scan()
    }

    /// Whether a scan has been started and not yet ended.
    pub fn scan_in_progress(&self) -> bool {
        self.scan != ScanState::Idle
    }

    fn finish_scan(&mut self, leaf: PageId) -> Result<()> {
        self.scan = ScanState::Exhausted;
        self.bpm.unpin_page(leaf, false)?;
        debug!("scan exhausted at leaf {}", leaf);
        Ok(())
    }

    /// Drop the pin of an active scan, leaving the cursor idle.
    fn release_scan(&mut self) -> Result<()> {
        let state = std::mem::take(&mut self.scan);
        if let ScanState::Active { leaf, .. } = state {
            self.bpm.unpin_page(leaf, false)?;
        }
        Ok(())
    }
}
