//! Common types and utilities shared across the crate.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Identifiers (PageId, FrameId, RecordId)
//! - Attribute type tags

pub mod config;
mod datatype;
pub mod error;
mod frame_id;
mod page_id;
mod record_id;

pub use datatype::Datatype;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
pub use record_id::RecordId;
