//! Rolling window of recently accepted block ids.
//!
//! The window is a bounded FIFO used as an anti-replay guard at receipt
//! time: a candidate block whose id is already in the window was seen
//! within the last few slots and is rejected without further work. It is
//! rebuilt from storage on startup and appended to on every accepted
//! block.

use std::collections::VecDeque;

use crate::types::BlockId;

/// Bounded FIFO of the last `capacity` accepted block ids, most-recent
/// last.
#[derive(Clone, Debug)]
pub struct RecentBlockIds {
    ids: VecDeque<BlockId>,
    capacity: usize,
}

impl RecentBlockIds {
    /// Creates an empty window. A zero capacity is clamped to one so the
    /// window can always hold the most recent id.
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends `id`, evicting the oldest entry once over capacity.
    pub fn push(&mut self, id: BlockId) {
        self.ids.push_back(id);
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    /// Returns `true` if `id` is one of the recently accepted block ids.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    /// Replaces the window content with `ids` (oldest first), keeping at
    /// most the final `capacity` entries.
    pub fn fill(&mut self, ids: Vec<BlockId>) {
        self.ids = ids.into_iter().collect();
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
