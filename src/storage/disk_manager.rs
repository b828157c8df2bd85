//! Disk Manager - low-level file I/O for pages.
//!
//! The [`DiskManager`] is the file store beneath the buffer pool:
//! - Existence checks, creation and opening of a backing file
//! - Reading and writing pages
//! - Handing out fresh page ids

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single backing file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page ids are only ever assigned here, by [`DiskManager::allocate_page`].
///
/// # Durability
/// Writes go to the OS page cache; [`DiskManager::sync`] forces them to
/// stable storage. The buffer pool calls it once per flush.
pub struct DiskManager {
    file: File,
    path: PathBuf,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Whether a backing file exists at `path`.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Create a new backing file.
    ///
    /// # Errors
    /// Returns `Error::FileAlreadyExists` if something is already at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::FileAlreadyExists(path.clone()),
                _ => Error::Io(e),
            })?;

        debug!("created {}", path.display());
        Ok(Self {
            file,
            path,
            page_count: 0,
        })
    }

    /// Open an existing backing file.
    ///
    /// # Errors
    /// Returns `Error::FileNotFound` if there is no file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::FileNotFound(path.clone()),
                _ => Error::Io(e),
            })?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        debug!("opened {} ({} pages)", path.display(), page_count);
        Ok(Self {
            file,
            path,
            page_count,
        })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;

        Ok(())
    }

    /// Allocate a new zero-filled page at the end of the file.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let new_len = (self.page_count as u64 + 1) * (PAGE_SIZE as u64);
        self.file.set_len(new_len)?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Force every write issued so far to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
