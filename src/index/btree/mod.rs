//! Disk-resident B+Tree over `i32` keys.
//!
//! # Structure
//! ```text
//!                     ┌──────────────┐
//!                     │ root (int.)  │   level 0: children are internal
//!                     └──────┬───────┘
//!              ┌─────────────┴─────────────┐
//!        ┌─────┴──────┐              ┌─────┴──────┐
//!        │  internal  │              │  internal  │   level 1: children are leaves
//!        └─────┬──────┘              └─────┬──────┘
//!        ┌─────┴─────┐               ┌─────┴─────┐
//!     [leaf]───▶[leaf]───────────▶[leaf]───▶[leaf]     right links in key order
//! ```
//!
//! Page 0 of the file holds [`meta::IndexMeta`]. The root is always an
//! internal node; a fresh index has a level-1 root with no keys and no
//! children until the first insert.
//!
//! - [`node`]: typed views over leaf and internal pages
//! - [`meta`]: the metadata page
//! - [`BTreeIndex`]: open/create, bulk load, traversal
//! - insertion, scanning and the integrity check live in their own files
//!   as further `impl BTreeIndex` blocks

mod config;
mod index;
mod insert;
pub mod meta;
pub mod node;
mod scan;
mod verify;

pub use config::IndexConfig;
pub use index::BTreeIndex;
pub use node::{Key, INTERNAL_CAPACITY, LEAF_CAPACITY};
pub use scan::Operator;
pub use verify::TreeShape;
