//! Storage layer - disk I/O, page formats and base relations.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level file I/O (the file store)
//! - [`page`] - Page types and layouts
//! - [`relation`] - Fixed-length record files and their scans

mod disk_manager;
pub mod page;
pub mod relation;

pub use disk_manager::DiskManager;
pub use relation::{FileScan, RelationFile, RelationScan, Tuple};
