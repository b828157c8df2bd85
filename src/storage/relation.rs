//! Base relations: fixed-length records stored in a paged file.
//!
//! An index is built by draining a [`RelationScan`]. [`RelationFile`] is the
//! paged implementation used in practice; any source of [`Tuple`]s can stand
//! in for it.
//!
//! # Layout
//! ```text
//! Page 0 (Meta):  header | record_len: u16 @16 | last_page: u32 @20
//! Page n (Data):  header | num_records: u16 @16 | records from @24, record_len each
//! ```

use std::path::Path;

use log::{debug, error};

use crate::buffer::{BufferPoolManager, StatsSnapshot};
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::PageType;
use crate::storage::DiskManager;

const HEADER_PAGE: PageId = PageId(0);
const OFFSET_RECORD_LEN: usize = 16;
const OFFSET_LAST_PAGE: usize = 20;
const OFFSET_NUM_RECORDS: usize = 16;
const OFFSET_RECORDS: usize = 24;

/// One tuple of a base relation together with its locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub rid: RecordId,
    pub data: Vec<u8>,
}

/// Source of tuples consumed while bulk-building an index.
///
/// Tuples come in an undefined but exhaustive order; `Ok(None)` marks the end
/// of the relation and is not an error.
pub trait RelationScan {
    fn scan_next(&mut self) -> Result<Option<Tuple>>;
}

impl RelationScan for std::vec::IntoIter<Tuple> {
    fn scan_next(&mut self) -> Result<Option<Tuple>> {
        Ok(self.next())
    }
}

/// A relation of fixed-length records in its own paged file.
pub struct RelationFile {
    bpm: BufferPoolManager,
    record_len: usize,
    last_page: PageId,
}

impl RelationFile {
    /// Create a new relation file holding records of `record_len` bytes.
    pub fn create<P: AsRef<Path>>(path: P, record_len: usize, pool_size: usize) -> Result<Self> {
        if record_len == 0 || record_len > PAGE_SIZE - OFFSET_RECORDS {
            return Err(Error::InvalidConfig(format!(
                "record length {} does not fit a page",
                record_len
            )));
        }

        let bpm = BufferPoolManager::new(pool_size, DiskManager::create(path)?);
        {
            let mut guard = bpm.new_page()?;
            guard.init(PageType::Meta);
            let data = guard.as_mut_slice();
            data[OFFSET_RECORD_LEN..OFFSET_RECORD_LEN + 2]
                .copy_from_slice(&(record_len as u16).to_le_bytes());
            PageId::INVALID.write_to(&mut data[OFFSET_LAST_PAGE..]);
        }

        Ok(Self {
            bpm,
            record_len,
            last_page: PageId::INVALID,
        })
    }

    /// Open an existing relation file.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: usize) -> Result<Self> {
        let bpm = BufferPoolManager::new(pool_size, DiskManager::open(path)?);
        let (record_len, last_page) = {
            let guard = bpm.fetch_page_read(HEADER_PAGE)?;
            if !guard.is_type(PageType::Meta) {
                return Err(Error::CorruptNode {
                    page_id: HEADER_PAGE.0,
                    reason: "relation header page has wrong type",
                });
            }
            let data = guard.as_slice();
            let record_len =
                u16::from_le_bytes([data[OFFSET_RECORD_LEN], data[OFFSET_RECORD_LEN + 1]]);
            (
                record_len as usize,
                PageId::from_bytes(&data[OFFSET_LAST_PAGE..]),
            )
        };

        Ok(Self {
            bpm,
            record_len,
            last_page,
        })
    }

    /// Length shared by every record.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    fn records_per_page(&self) -> usize {
        (PAGE_SIZE - OFFSET_RECORDS) / self.record_len
    }

    /// Append a record, returning where it was stored.
    pub fn insert_record(&mut self, record: &[u8]) -> Result<RecordId> {
        if record.len() != self.record_len {
            return Err(Error::RecordSizeMismatch {
                expected: self.record_len,
                actual: record.len(),
            });
        }

        if !self.last_page.is_valid() || self.page_is_full(self.last_page)? {
            self.start_data_page()?;
        }

        let mut guard = self.bpm.fetch_page_write(self.last_page)?;
        let page_id = guard.page_id();
        let data = guard.as_mut_slice();
        let slot = read_num_records(data);
        let offset = OFFSET_RECORDS + slot * self.record_len;
        data[offset..offset + self.record_len].copy_from_slice(record);
        data[OFFSET_NUM_RECORDS..OFFSET_NUM_RECORDS + 2]
            .copy_from_slice(&((slot + 1) as u16).to_le_bytes());

        Ok(RecordId::new(page_id, slot as u16))
    }

    fn page_is_full(&self, page_id: PageId) -> Result<bool> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        Ok(read_num_records(guard.as_slice()) >= self.records_per_page())
    }

    /// Allocate a fresh data page and record it as the last one.
    fn start_data_page(&mut self) -> Result<PageId> {
        let page_id = {
            let mut guard = self.bpm.new_page()?;
            guard.init(PageType::Data);
            guard.page_id()
        };

        let mut header = self.bpm.fetch_page_write(HEADER_PAGE)?;
        page_id.write_to(&mut header.as_mut_slice()[OFFSET_LAST_PAGE..]);
        debug!("relation grew to data page {}", page_id);

        self.last_page = page_id;
        Ok(page_id)
    }

    /// Copy out the record stored at `rid`.
    pub fn get_record(&self, rid: RecordId) -> Result<Vec<u8>> {
        let missing = Error::RecordNotFound {
            page: rid.page_number.0,
            slot: rid.slot_number,
        };
        if rid.page_number == HEADER_PAGE || !rid.page_number.is_valid() {
            return Err(missing);
        }
        if rid.page_number.0 > self.last_page.0 || !self.last_page.is_valid() {
            return Err(missing);
        }

        let guard = self.bpm.fetch_page_read(rid.page_number)?;
        let data = guard.as_slice();
        let slot = rid.slot_number as usize;
        if !guard.is_type(PageType::Data) || slot >= read_num_records(data) {
            return Err(missing);
        }

        let offset = OFFSET_RECORDS + slot * self.record_len;
        Ok(data[offset..offset + self.record_len].to_vec())
    }

    /// Start a scan over every record in page/slot order.
    pub fn scan(&self) -> FileScan<'_> {
        FileScan {
            relation: self,
            page: PageId::new(HEADER_PAGE.0 + 1),
            slot: 0,
        }
    }

    /// Write dirty pages back to disk.
    pub fn flush(&self) -> Result<()> {
        self.bpm.flush_all_pages()
    }

    pub fn buffer_stats(&self) -> StatsSnapshot {
        self.bpm.stats().snapshot()
    }
}

impl Drop for RelationFile {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.flush_all_pages() {
            error!("failed to flush relation file: {}", e);
        }
    }
}

fn read_num_records(data: &[u8]) -> usize {
    u16::from_le_bytes([data[OFFSET_NUM_RECORDS], data[OFFSET_NUM_RECORDS + 1]]) as usize
}

/// Sequential scan over a [`RelationFile`].
pub struct FileScan<'a> {
    relation: &'a RelationFile,
    page: PageId,
    slot: usize,
}

impl RelationScan for FileScan<'_> {
    fn scan_next(&mut self) -> Result<Option<Tuple>> {
        let last = self.relation.last_page;
        while last.is_valid() && self.page.0 <= last.0 {
            let guard = self.relation.bpm.fetch_page_read(self.page)?;
            let data = guard.as_slice();

            if self.slot < read_num_records(data) {
                let len = self.relation.record_len;
                let offset = OFFSET_RECORDS + self.slot * len;
                let tuple = Tuple {
                    rid: RecordId::new(self.page, self.slot as u16),
                    data: data[offset..offset + len].to_vec(),
                };
                self.slot += 1;
                return Ok(Some(tuple));
            }

            self.page = PageId::new(self.page.0 + 1);
            self.slot = 0;
        }

        Ok(None)
    }
}
