//! RocksDB-backed block index.
//!
//! Blocks and chain metadata persist in a RocksDB instance with
//! dedicated column families:
//!
//! - `"blocks"`:  maps block id (utf-8 bytes) -> canonical block bytes,
//! - `"heights"`: maps big-endian height -> block id, for ordered scans,
//! - `"meta"`:    stores the id of the most recently applied block under
//!   a fixed `"last"` key.

use std::{path::Path, sync::Arc};

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};

use crate::consensus::context::BlockIndex;
use crate::consensus::error::ModuleError;
use crate::storage::StorageError;
use crate::types::{Block, BlockId};

/// Configuration for [`RocksDbBlockIndex`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if
    /// they do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/chain-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`BlockIndex`].
pub struct RocksDbBlockIndex {
    db: DB,
}

impl RocksDbBlockIndex {
    /// Opens (or creates) a RocksDB-backed index at the configured path.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("blocks", Options::default()),
            ColumnFamilyDescriptor::new("heights", Options::default()),
            ColumnFamilyDescriptor::new("meta", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self { db })
    }

    /// Persists a block under its derived id and height.
    pub fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let id = block.id.as_ref().ok_or(StorageError::MissingBlockId)?;
        let bytes = block.canonical_bytes();

        let cf_blocks = self.cf("blocks")?;
        let cf_heights = self.cf("heights")?;
        let cf_meta = self.cf("meta")?;

        self.db.put_cf(&cf_blocks, id.as_str().as_bytes(), bytes)?;
        self.db.put_cf(
            &cf_heights,
            block.height.to_be_bytes(),
            id.as_str().as_bytes(),
        )?;
        self.db.put_cf(&cf_meta, b"last", id.as_str().as_bytes())?;
        Ok(())
    }

    /// Fetches a block by id, if present.
    pub fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StorageError> {
        let cf = self.cf("blocks")?;
        match self.db.get_cf(&cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode_block(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns the most recently applied block, if any.
    pub fn last_block(&self) -> Result<Option<Block>, StorageError> {
        let cf_meta = self.cf("meta")?;
        let Some(id_bytes) = self.db.get_cf(&cf_meta, b"last")? else {
            return Ok(None);
        };
        let id = String::from_utf8(id_bytes)
            .map_err(|_| StorageError::CorruptedMeta("last block id"))?;
        self.get_block(&BlockId::new(id))
    }

    /// Ids of the `n` most recently persisted blocks, oldest first.
    pub fn last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, StorageError> {
        let cf = self.cf("heights")?;
        let mut ids = Vec::with_capacity(n);
        for item in self.db.iterator_cf(&cf, IteratorMode::End).take(n) {
            let (_, id_bytes) = item?;
            let id = String::from_utf8(id_bytes.to_vec())
                .map_err(|_| StorageError::CorruptedMeta("height index id"))?;
            ids.push(BlockId::new(id));
        }
        ids.reverse();
        Ok(ids)
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or(StorageError::MissingColumnFamily(name))
    }
}

fn decode_block(bytes: &[u8]) -> Result<Block, StorageError> {
    let cfg = bincode::config::standard();
    let (block, _): (Block, usize) = bincode::serde::decode_from_slice(bytes, cfg)
        .map_err(|e| StorageError::Encoding(e.to_string()))?;
    Ok(block)
}

impl BlockIndex for RocksDbBlockIndex {
    fn block_exists(&self, id: &BlockId) -> Result<bool, ModuleError> {
        let cf = self.cf("blocks").map_err(|e| ModuleError::new(e.to_string()))?;
        let found = self
            .db
            .get_cf(&cf, id.as_str().as_bytes())
            .map_err(|e| ModuleError::new(e.to_string()))?;
        Ok(found.is_some())
    }

    fn load_last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, ModuleError> {
        self.last_block_ids(n)
            .map_err(|e| ModuleError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::types::{Hash256, PublicKey, Signature};

    fn stored_block(height: u64) -> Block {
        Block {
            id: Some(BlockId::new(format!("block-{height}"))),
            version: 0,
            timestamp: height * 10,
            height,
            previous_block: (height > 1).then(|| BlockId::new(format!("block-{}", height - 1))),
            number_of_transactions: 0,
            total_amount: 0,
            total_fee: 0,
            reward: 0,
            payload_length: 0,
            payload_hash: Hash256::compute(&[]),
            generator_public_key: PublicKey(vec![1u8; 32]),
            block_signature: Some(Signature(vec![2u8; 64])),
            transactions: Vec::new(),
        }
    }

    fn open_temp() -> (TempDir, RocksDbBlockIndex) {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        let index = RocksDbBlockIndex::open(&cfg).expect("open RocksDB");
        (tmp, index)
    }

    #[test]
    fn save_get_and_last_roundtrip() {
        let (_tmp, index) = open_temp();

        let block = stored_block(1);
        index.save_block(&block).expect("save");

        let fetched = index
            .get_block(&BlockId::new("block-1"))
            .expect("query")
            .expect("block present");
        assert_eq!(fetched.height, 1);

        let last = index.last_block().expect("query").expect("last present");
        assert_eq!(last.id, block.id);
    }

    #[test]
    fn save_requires_a_derived_id() {
        let (_tmp, index) = open_temp();
        let mut block = stored_block(1);
        block.id = None;

        let err = index.save_block(&block).unwrap_err();
        assert!(matches!(err, StorageError::MissingBlockId));
    }

    #[test]
    fn block_exists_matches_saved_ids() {
        let (_tmp, index) = open_temp();
        index.save_block(&stored_block(1)).expect("save");

        assert!(index.block_exists(&BlockId::new("block-1")).expect("query"));
        assert!(!index.block_exists(&BlockId::new("block-9")).expect("query"));
    }

    #[test]
    fn last_block_ids_come_back_oldest_first() {
        let (_tmp, index) = open_temp();
        for height in 1..=7 {
            index.save_block(&stored_block(height)).expect("save");
        }

        let ids = index.load_last_block_ids(3).expect("query");
        let ids: Vec<&str> = ids.iter().map(BlockId::as_str).collect();
        assert_eq!(ids, vec!["block-5", "block-6", "block-7"]);

        // Asking for more than exist returns everything.
        let all = index.load_last_block_ids(100).expect("query");
        assert_eq!(all.len(), 7);
    }
}
