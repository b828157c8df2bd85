//! Eviction policy implementations (replacers).
//!
//! - [`LruReplacer`] - evicts the least recently used unpinned frame, which
//!   keeps the root and upper levels of an index resident

mod lru;

pub use lru::LruReplacer;
