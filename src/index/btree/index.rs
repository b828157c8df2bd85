//! The index handle: lifecycle, bulk load and point traversal.

use std::path::Path;

use log::{debug, error, info, warn};

use crate::buffer::{BufferPoolManager, PageReadGuard, StatsSnapshot};
use crate::common::{Datatype, Error, PageId, Result};
use crate::storage::{DiskManager, RelationScan};

use super::config::{check_capacities, IndexConfig};
use super::meta::{IndexMeta, MAX_RELATION_NAME, META_PAGE_ID};
use super::node::{InternalNode, Key, LeafNode, KEY_SIZE, LEAF_PARENT_LEVEL};
use super::scan::ScanState;

/// A B+Tree over one integer attribute of a relation, stored in its own file.
///
/// Leaves hold `(key, RecordId)` pairs and are chained left to right; internal
/// nodes hold separators. The tree only grows at the root, so all leaves
/// always sit at the same depth.
///
/// Dropping the index ends any open scan and flushes every dirty page.
///
/// # Example
/// ```no_run
/// use interchange_btree::{BTreeIndex, Datatype, IndexConfig, Operator, RelationFile};
///
/// # fn main() -> interchange_btree::Result<()> {
/// let relation = RelationFile::open("/tmp/db/orders", 16)?;
/// let mut index = BTreeIndex::open_or_create(
///     "/tmp/db",
///     "orders",
///     &mut relation.scan(),
///     0,
///     Datatype::Integer,
///     IndexConfig::default(),
/// )?;
///
/// index.start_scan(10, Operator::GreaterThanOrEqual, 20, Operator::LessThan)?;
/// while let Ok(rid) = index.scan_next() {
///     println!("{}", rid);
/// }
/// index.end_scan()?;
/// # Ok(())
/// # }
/// ```
pub struct BTreeIndex {
    pub(super) bpm: BufferPoolManager,
    pub(super) index_name: String,
    pub(super) relation_name: String,
    pub(super) key_offset: usize,
    pub(super) root: PageId,
    pub(super) leaf_capacity: usize,
    pub(super) node_capacity: usize,
    pub(super) scan: ScanState,
}

impl BTreeIndex {
    /// File name of the index over `relation_name` at `key_offset`.
    pub fn file_name(relation_name: &str, key_offset: usize) -> String {
        format!("{}.{}", relation_name, key_offset)
    }

    /// Open the index over `relation_name` in `dir`, building it from
    /// `relation` if its file does not exist yet.
    ///
    /// The file is named after the relation and the key offset (see
    /// [`file_name`](Self::file_name)). `relation` is only drained when the
    /// index is created.
    pub fn open_or_create<P, S>(
        dir: P,
        relation_name: &str,
        relation: &mut S,
        key_offset: usize,
        key_type: Datatype,
        config: IndexConfig,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        S: RelationScan + ?Sized,
    {
        let path = dir
            .as_ref()
            .join(Self::file_name(relation_name, key_offset));
        Self::open_or_create_at(path, relation_name, relation, key_offset, key_type, config)
    }

    /// Like [`open_or_create`](Self::open_or_create), with an explicit file path.
    pub fn open_or_create_at<P, S>(
        path: P,
        relation_name: &str,
        relation: &mut S,
        key_offset: usize,
        key_type: Datatype,
        config: IndexConfig,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        S: RelationScan + ?Sized,
    {
        config.validate()?;
        let path = path.as_ref();

        if DiskManager::exists(path) {
            return Self::open(path, relation_name, key_offset, key_type, config);
        }

        if key_type != Datatype::Integer {
            return Err(Error::UnsupportedKeyType(key_type));
        }
        if relation_name.len() > MAX_RELATION_NAME {
            return Err(Error::RelationNameTooLong(relation_name.len()));
        }
        if u32::try_from(key_offset).is_err() {
            return Err(Error::KeyOffsetTooLarge(key_offset));
        }

        let built = Self::create(path, relation_name, key_offset, config).and_then(|mut index| {
            index.bulk_load(relation)?;
            Ok(index)
        });
        match built {
            Err(e) if !matches!(e, Error::FileAlreadyExists(_)) => {
                warn!("building index {} failed: {}", display_name(path), e);
                if DiskManager::exists(path) {
                    if let Err(cleanup) = std::fs::remove_file(path) {
                        error!("failed to remove partial index {}: {}", path.display(), cleanup);
                    }
                }
                Err(e)
            }
            built => built,
        }
    }

    /// Insert every tuple of `relation`, keyed at this index's offset.
    fn bulk_load<S: RelationScan + ?Sized>(&mut self, relation: &mut S) -> Result<()> {
        let mut loaded = 0u64;
        while let Some(tuple) = relation.scan_next()? {
            let key = extract_key(&tuple.data, self.key_offset)?;
            self.insert_entry(key, tuple.rid)?;
            loaded += 1;
        }
        info!(
            "built index {} over {} tuples of {}",
            self.index_name, loaded, self.relation_name
        );
        Ok(())
    }

    fn open(
        path: &Path,
        relation_name: &str,
        key_offset: usize,
        key_type: Datatype,
        config: IndexConfig,
    ) -> Result<Self> {
        let bpm = BufferPoolManager::new(config.pool_size, DiskManager::open(path)?);
        let index_name = display_name(path);

        let meta = {
            let guard = bpm.fetch_page_read(META_PAGE_ID)?;
            IndexMeta::read_from(guard.as_slice())?
        };
        if !meta.matches(relation_name, key_offset, key_type) {
            return Err(Error::MetadataMismatch {
                index: index_name,
                relation: relation_name.to_string(),
                key_offset,
                key_type,
            });
        }
        if check_capacities(meta.leaf_capacity, meta.node_capacity).is_err() {
            return Err(Error::CorruptNode {
                page_id: META_PAGE_ID.0,
                reason: "stored capacities out of range",
            });
        }

        info!(
            "opened index {} (root {}, L={}, N={})",
            index_name, meta.root, meta.leaf_capacity, meta.node_capacity
        );

        Ok(Self {
            bpm,
            index_name,
            relation_name: meta.relation_name,
            key_offset: meta.key_offset,
            root: meta.root,
            leaf_capacity: meta.leaf_capacity,
            node_capacity: meta.node_capacity,
            scan: ScanState::Idle,
        })
    }

    /// Lay out a fresh file: metadata on page 0, an empty root on page 1.
    fn create(
        path: &Path,
        relation_name: &str,
        key_offset: usize,
        config: IndexConfig,
    ) -> Result<Self> {
        let bpm = BufferPoolManager::new(config.pool_size, DiskManager::create(path)?);

        let meta_page = bpm.new_page()?.page_id();
        if meta_page != META_PAGE_ID {
            return Err(Error::CorruptNode {
                page_id: meta_page.0,
                reason: "metadata page not first in a fresh file",
            });
        }

        let root = {
            let mut guard = bpm.new_page()?;
            let root = guard.page_id();
            InternalNode::new(guard.as_mut_slice(), config.node_capacity).init(LEAF_PARENT_LEVEL);
            root
        };

        let meta = IndexMeta {
            relation_name: relation_name.to_string(),
            key_offset,
            key_type: Datatype::Integer,
            root,
            leaf_capacity: config.leaf_capacity,
            node_capacity: config.node_capacity,
        };
        {
            let mut guard = bpm.fetch_page_write(META_PAGE_ID)?;
            meta.write_to(guard.as_mut_slice())?;
        }

        let index_name = display_name(path);
        info!("created index {} (L={}, N={})", index_name, meta.leaf_capacity, meta.node_capacity);

        Ok(Self {
            bpm,
            index_name,
            relation_name: meta.relation_name,
            key_offset,
            root,
            leaf_capacity: meta.leaf_capacity,
            node_capacity: meta.node_capacity,
            scan: ScanState::Idle,
        })
    }

    /// Walk from the root to the leaf where entries `>= target` begin.
    ///
    /// Each internal node is released before its child is read. Returns the
    /// pinned leaf and the first slot whose key is `>= target`, which may be
    /// past the leaf's last entry when only later leaves qualify. Returns
    /// `None` while the tree is still empty.
    pub(super) fn descend_to_leaf(&self, target: Key) -> Result<Option<(PageReadGuard<'_>, usize)>> {
        let mut page_id = self.root;

        loop {
            let (child, level) = {
                let guard = self.bpm.fetch_page_read(page_id)?;
                let node = InternalNode::new(guard.as_slice(), self.node_capacity);
                if !node.is_valid_type() {
                    return Err(corrupt(page_id, "expected internal node"));
                }
                if node.num_keys() > self.node_capacity {
                    return Err(corrupt(page_id, "key count above capacity"));
                }
                if page_id == self.root && node.is_empty_root() {
                    return Ok(None);
                }
                let child = node.child_at(node.seek_slot(target));
                (child, node.level())
            };

            if !child.is_valid() {
                return Err(corrupt(page_id, "separator without child"));
            }

            if level == LEAF_PARENT_LEVEL {
                let leaf = self.bpm.fetch_page_read(child)?;
                let node = LeafNode::new(leaf.as_slice(), self.leaf_capacity);
                if !node.is_valid_type() {
                    return Err(corrupt(child, "expected leaf node"));
                }
                if node.num_keys() > self.leaf_capacity {
                    return Err(corrupt(child, "leaf entry count above capacity"));
                }
                let slot = node.lower_bound(target);
                debug!("descended to leaf {} slot {} for key {}", child, slot, target);
                return Ok(Some((leaf, slot)));
            }

            page_id = child;
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Name of the index file (`"{relation}.{key_offset}"` for indexes
    /// opened through [`open_or_create`](Self::open_or_create)).
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    pub fn key_offset(&self) -> usize {
        self.key_offset
    }

    pub fn root_page_id(&self) -> PageId {
        self.root
    }

    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    pub fn buffer_stats(&self) -> StatsSnapshot {
        self.bpm.stats().snapshot()
    }

    /// Pages of this index currently pinned in its buffer pool.
    pub fn pinned_page_count(&self) -> usize {
        self.bpm.pinned_page_count()
    }

    /// Write all dirty pages back to the index file.
    pub fn flush(&self) -> Result<()> {
        self.bpm.flush_all_pages()
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        let _ = self.end_scan();
        if let Err(e) = self.bpm.flush_all_pages() {
            error!("failed to flush index {}: {}", self.index_name, e);
        }
    }
}

/// Read the little-endian `i32` key at `offset` in a tuple.
pub(super) fn extract_key(data: &[u8], offset: usize) -> Result<Key> {
    let out_of_bounds = || Error::KeyOutOfBounds {
        offset,
        len: data.len(),
    };
    let end = offset.checked_add(KEY_SIZE).ok_or_else(out_of_bounds)?;
    let bytes = data.get(offset..end).ok_or_else(out_of_bounds)?;
    Ok(Key::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(super) fn corrupt(page_id: PageId, reason: &'static str) -> Error {
    Error::CorruptNode {
        page_id: page_id.0,
        reason,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Record locator for tests that only care about keys.
#[cfg(test)]
pub(super) fn rid_for(key: Key) -> crate::common::RecordId {
    crate::common::RecordId::new(PageId::new(key as u32 & 0xFFFF), (key as u32 >> 16) as u16)
}

/// Store an entry count far beyond the configured leaf capacity.
#[cfg(test)]
pub(super) fn overfill_leaf(index: &BTreeIndex, leaf: PageId) {
    use super::node::OFFSET_LEAF_NUM_KEYS;

    let mut guard = index.bpm.fetch_page_write(leaf).unwrap();
    guard.as_mut_slice()[OFFSET_LEAF_NUM_KEYS..OFFSET_LEAF_NUM_KEYS + 4]
        .copy_from_slice(&1000u32.to_le_bytes());
}
