//! Buffer pool management.
//!
//! The buffer pool is the page store the index reads and writes through.
//! It manages a fixed pool of frames, each holding one page of one file.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache and pin bookkeeping
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
