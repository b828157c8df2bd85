//! Buffer Pool Manager - the page store the index runs on.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting, through RAII guards or explicit pins
//! - Dirty page write-back with checksums
//! - LRU eviction

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use log::{trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching the pages of one backing file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ LruReplacer  │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Page store contract
/// - allocate: [`new_page`](Self::new_page)
/// - read + pin: [`fetch_page_read`](Self::fetch_page_read) /
///   [`fetch_page_write`](Self::fetch_page_write), or [`pin_page`](Self::pin_page)
///   for a pin that must outlive any borrow
/// - unpin: drop the guard, or [`unpin_page`](Self::unpin_page)
/// - flush: [`flush_all_pages`](Self::flush_all_pages)
///
/// Holding a guard while calling `flush_all_pages` from the same thread
/// deadlocks on the page lock; flush only between operations.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<LruReplacer>,
    disk_manager: Mutex<DiskManager>,
    stats: BufferPoolStats,
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the sentinel page id
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::ChecksumMismatch` if the page on disk is damaged
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same errors as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page without borrowing it.
    ///
    /// The page stays resident until a matching [`unpin_page`](Self::unpin_page).
    pub fn pin_page(&self, page_id: PageId) -> Result<()> {
        self.fetch_page_internal(page_id)?;
        Ok(())
    }

    /// Release one pin taken with [`pin_page`](Self::pin_page).
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page is not resident or has no pins.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let frame_id = {
            let pt = self.page_table.read();
            pt.get(&page_id).copied()
        }
        .ok_or(Error::PageNotPinned(page_id.0))?;

        if !self.frames[frame_id.0].is_pinned() {
            return Err(Error::PageNotPinned(page_id.0));
        }

        self.unpin_page_internal(frame_id, is_dirty);
        Ok(())
    }

    // ========================================================================
    // Public API: Allocate and flush
    // ========================================================================

    /// Allocate a new zero-filled page and load it into the buffer pool.
    ///
    /// The page id comes from the disk manager; nothing above this layer
    /// assigns ids.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.get_free_frame()?;

        let allocated = {
            let mut dm = self.disk_manager.lock();
            dm.allocate_page()
        };
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        self.stats.pages_allocated.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();

        self.page_table.write().insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        trace!("allocated {} in {}", page_id, frame_id);
        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Write every dirty page back and force the file to stable storage.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }

        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of resident pages with at least one pin.
    pub fn pinned_page_count(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| f.page_id().is_some() && f.is_pinned())
            .count()
    }

    /// Number of pages in the backing file.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    // ========================================================================
    // Internal: Called by PageGuard on drop
    // ========================================================================

    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.handle_cache_hit(frame_id);
                return Ok(frame_id);
            }
        }

        self.handle_cache_miss(page_id)
    }

    fn handle_cache_hit(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Load a page from disk, verify it, then give it a frame.
    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let page_data = {
            let mut dm = self.disk_manager.lock();
            dm.read_page(page_id)?
        };
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        if !page_data.verify_checksum() {
            warn!("checksum mismatch reading {}", page_id);
            return Err(Error::ChecksumMismatch(page_id.0));
        }

        let frame_id = self.get_free_frame()?;
        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        frame.set_page_id(Some(page_id));
        frame.pin();

        self.page_table.write().insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = {
            let mut replacer = self.replacer.lock();
            replacer.evict().ok_or(Error::NoFreeFrames)?
        };
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        if let Some(pid) = frame.page_id() {
            trace!("evicting {} from {}", pid, frame_id);
            self.flush_frame(frame_id, pid)?;
            self.page_table.write().remove(&pid);
        }

        frame.clear_dirty();
        frame.set_page_id(None);

        Ok(frame_id)
    }

    /// Stamp the checksum of a dirty frame and write it out.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let mut page = frame.page_mut();
            page.update_checksum();
            {
                let mut dm = self.disk_manager.lock();
                dm.write_page(page_id, &page)?;
            }
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PageType;
    use tempfile::tempdir;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let dm = DiskManager::create(&path).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_new_page_ids_come_from_disk() {
        let (bpm, _dir) = create_test_bpm(10);
        assert_eq!(bpm.pool_size(), 10);

        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(0));
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(1));
        assert_eq!(bpm.disk_page_count(), 2);
        assert_eq!(bpm.stats().snapshot().pages_allocated, 2);
    }

    #[test]
    fn test_write_then_read() {
        let (bpm, _dir) = create_test_bpm(10);

        let pid = {
            let mut guard = bpm.new_page().unwrap();
            guard.init(PageType::BTreeLeaf);
            guard.as_mut_slice()[100] = 0xCD;
            guard.page_id()
        };

        let guard = bpm.fetch_page_read(pid).unwrap();
        assert!(guard.is_type(PageType::BTreeLeaf));
        assert_eq!(guard.as_slice()[100], 0xCD);
    }

    #[test]
    fn test_untouched_write_guard_stays_clean() {
        let (bpm, _dir) = create_test_bpm(10);
        {
            let mut guard = bpm.new_page().unwrap();
            guard.init(PageType::Data);
        }
        bpm.flush_all_pages().unwrap();
        let written = bpm.stats().snapshot().pages_written;

        {
            let guard = bpm.fetch_page_write(PageId::new(0)).unwrap();
            assert!(!guard.is_dirty());
        }
        bpm.flush_all_pages().unwrap();
        assert_eq!(bpm.stats().snapshot().pages_written, written);
    }

    #[test]
    fn test_dirty_page_survives_eviction() {
        let (bpm, _dir) = create_test_bpm(1);

        {
            let mut guard = bpm.new_page().unwrap();
            guard.init(PageType::Data);
            guard.as_mut_slice()[64] = 0x42;
        }
        {
            let _guard = bpm.new_page().unwrap();
        }

        let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[64], 0x42);
        assert_eq!(bpm.stats().snapshot().evictions, 2);
    }

    #[test]
    fn test_explicit_pin_blocks_eviction() {
        let (bpm, _dir) = create_test_bpm(2);
        let pid = bpm.new_page().unwrap().page_id();

        bpm.pin_page(pid).unwrap();
        assert_eq!(bpm.pinned_page_count(), 1);

        let _other = bpm.new_page().unwrap();
        // Both frames pinned now.
        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));

        bpm.unpin_page(pid, false).unwrap();
        assert!(matches!(
            bpm.unpin_page(pid, false),
            Err(Error::PageNotPinned(_))
        ));
    }

    #[test]
    fn test_pinned_page_can_still_be_written() {
        let (bpm, _dir) = create_test_bpm(4);
        let pid = bpm.new_page().unwrap().page_id();

        bpm.pin_page(pid).unwrap();
        bpm.fetch_page_write(pid).unwrap().as_mut_slice()[20] = 7;
        assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[20], 7);
        bpm.unpin_page(pid, false).unwrap();
        assert_eq!(bpm.pinned_page_count(), 0);
    }

    #[test]
    fn test_invalid_page_id_rejected() {
        let (bpm, _dir) = create_test_bpm(4);
        assert!(matches!(
            bpm.fetch_page_read(PageId::INVALID),
            Err(Error::InvalidPageId(_))
        ));
        assert!(matches!(
            bpm.fetch_page_read(PageId::new(9)),
            Err(Error::PageNotFound(9))
        ));
    }

    #[test]
    fn test_flush_stamps_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let bpm = BufferPoolManager::new(4, DiskManager::create(&path).unwrap());
            let mut guard = bpm.new_page().unwrap();
            guard.init(PageType::BTreeInternal);
            guard.as_mut_slice()[300] = 0x99;
            drop(guard);
            bpm.flush_all_pages().unwrap();
        }

        let mut dm = DiskManager::open(&path).unwrap();
        let page = dm.read_page(PageId::new(0)).unwrap();
        assert!(page.verify_checksum());
        assert_ne!(page.header().checksum, 0);
    }

    #[test]
    fn test_corrupted_page_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let bpm = BufferPoolManager::new(4, DiskManager::create(&path).unwrap());
            let mut guard = bpm.new_page().unwrap();
            guard.init(PageType::BTreeLeaf);
            drop(guard);
            bpm.flush_all_pages().unwrap();
        }
        {
            let mut dm = DiskManager::open(&path).unwrap();
            let mut page = dm.read_page(PageId::new(0)).unwrap();
            page.as_mut_slice()[1000] ^= 0xFF;
            dm.write_page(PageId::new(0), &page).unwrap();
        }

        let bpm = BufferPoolManager::new(4, DiskManager::open(&path).unwrap());
        assert!(matches!(
            bpm.fetch_page_read(PageId::new(0)),
            Err(Error::ChecksumMismatch(0))
        ));
    }
}
