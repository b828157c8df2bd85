//! LRU (Least Recently Used) replacement policy.

use std::collections::{HashMap, HashSet};

use crate::common::FrameId;

/// Evicts the evictable frame whose last access is oldest.
///
/// Every access stamps the frame with a monotonically increasing tick.
/// Victim selection scans the evictable set, which is bounded by the pool
/// size.
pub struct LruReplacer {
    /// Tick of the most recent access per frame.
    last_access: HashMap<FrameId, u64>,

    /// Frames that are currently evictable (pin_count == 0).
    evictable: HashSet<FrameId>,

    tick: u64,
}

impl LruReplacer {
    /// Create a new LRU replacer.
    pub fn new() -> Self {
        Self {
            last_access: HashMap::new(),
            evictable: HashSet::new(),
            tick: 0,
        }
    }

    /// Record that a frame was accessed.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.tick += 1;
        self.last_access.insert(frame_id, self.tick);
    }

    /// Mark a frame as evictable (pin_count dropped to 0) or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Select a victim frame for eviction.
    ///
    /// Returns the least recently used evictable frame, or None if all frames
    /// are pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let victim = self
            .evictable
            .iter()
            .min_by_key(|frame_id| self.last_access.get(frame_id).copied().unwrap_or(0))
            .copied()?;

        self.remove(victim);
        Some(victim)
    }

    /// Forget a frame entirely.
    pub fn remove(&mut self, frame_id: FrameId) {
        self.evictable.remove(&frame_id);
        self.last_access.remove(&frame_id);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_evicts_oldest_access() {
        let mut replacer = LruReplacer::new();

        for i in 0..3 {
            replacer.record_access(FrameId::new(i));
            replacer.set_evictable(FrameId::new(i), true);
        }
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_reaccess_moves_to_back() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.record_access(FrameId::new(0));
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_lru_skips_pinned() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }
}
