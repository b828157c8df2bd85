//! interchange-btree - a single-attribute B+Tree index over a paged file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        interchange-btree                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Index Layer (index/btree/)               │   │
//! │  │  BTreeIndex: bulk load → insert → descend → page store  │   │
//! │  │              scan cursor → descend → page store         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │              ↓ page ids              ↑ RelationScan            │
//! │  ┌──────────────────────────────┐ ┌─────────────────────────┐  │
//! │  │    Buffer Pool (buffer/)     │ │ Relations (storage/     │  │
//! │  │ BufferPoolManager + LRU +    │ │   relation.rs)          │  │
//! │  │ page guards + statistics     │ │ RelationFile, FileScan  │  │
//! │  └──────────────────────────────┘ └─────────────────────────┘  │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskManager + Page + PageHeader (CRC32)           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`buffer`] - Buffer pool management and LRU eviction
//! - [`storage`] - Disk I/O, page formats and base relations
//! - [`index`] - The B+Tree index
//!
//! # Quick Start
//! ```no_run
//! use interchange_btree::{BTreeIndex, Datatype, IndexConfig, Operator, RelationFile};
//!
//! # fn main() -> interchange_btree::Result<()> {
//! let mut relation = RelationFile::create("/tmp/db/people", 8, 16)?;
//! for age in [31i32, 17, 45] {
//!     let mut record = [0u8; 8];
//!     record[..4].copy_from_slice(&age.to_le_bytes());
//!     relation.insert_record(&record)?;
//! }
//!
//! let mut index = BTreeIndex::open_or_create(
//!     "/tmp/db",
//!     "people",
//!     &mut relation.scan(),
//!     0,
//!     Datatype::Integer,
//!     IndexConfig::default(),
//! )?;
//! index.start_scan(18, Operator::GreaterThanOrEqual, 65, Operator::LessThan)?;
//! let adult = index.scan_next()?;
//! println!("first adult at {}", adult);
//! index.end_scan()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Datatype, Error, FrameId, PageId, RecordId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use index::btree::{BTreeIndex, IndexConfig, Operator, TreeShape};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, FileScan, RelationFile, RelationScan, Tuple};
