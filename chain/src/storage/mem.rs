//! In-memory block index.
//!
//! Useful for unit tests, simulations and small devnets. Blocks live in
//! a `HashMap` keyed by id, with a height-ordered map alongside so the
//! last-N-ids query stays cheap.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::consensus::context::BlockIndex;
use crate::consensus::error::ModuleError;
use crate::storage::StorageError;
use crate::types::{Block, BlockId};

#[derive(Default)]
struct Inner {
    blocks: HashMap<String, Block>,
    by_height: BTreeMap<u64, BlockId>,
}

/// In-memory implementation of [`BlockIndex`].
///
/// Interior mutability keeps the save path `&self`, matching the shared
/// `Arc<dyn BlockIndex>` handle the processor holds.
#[derive(Default)]
pub struct InMemoryBlockIndex {
    inner: Mutex<Inner>,
}

impl InMemoryBlockIndex {
    /// Creates a new, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a block under its derived id.
    pub fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let id = block.id.clone().ok_or(StorageError::MissingBlockId)?;
        let mut inner = self.lock();
        inner.blocks.insert(id.to_string(), block.clone());
        inner.by_height.insert(block.height, id);
        Ok(())
    }

    /// Fetches a block by id, if present.
    pub fn get_block(&self, id: &BlockId) -> Option<Block> {
        self.lock().blocks.get(id.as_str()).cloned()
    }

    /// Returns the stored block with the greatest height, if any.
    pub fn last_block(&self) -> Option<Block> {
        let inner = self.lock();
        let (_, id) = inner.by_height.iter().next_back()?;
        inner.blocks.get(id.as_str()).cloned()
    }

    /// Returns the number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.lock().blocks.len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().blocks.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BlockIndex for InMemoryBlockIndex {
    fn block_exists(&self, id: &BlockId) -> Result<bool, ModuleError> {
        Ok(self.lock().blocks.contains_key(id.as_str()))
    }

    fn load_last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, ModuleError> {
        let inner = self.lock();
        let mut ids: Vec<BlockId> = inner
            .by_height
            .iter()
            .rev()
            .take(n)
            .map(|(_, id)| id.clone())
            .collect();
        ids.reverse();
        Ok(ids)
    }
}
