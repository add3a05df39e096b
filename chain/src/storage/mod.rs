//! Storage backends for the chain.
//!
//! This module provides concrete implementations of the
//! [`crate::consensus::context::BlockIndex`] trait, plus the block
//! save/load helpers a node shell builds its chain-application stage on:
//!
//! - an in-memory index ([`mem::InMemoryBlockIndex`]) suitable for tests
//!   and devnets,
//! - a RocksDB-backed index ([`rocksdb::RocksDbBlockIndex`]) for
//!   persistent validator nodes.

use std::fmt;

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryBlockIndex;
pub use rocksdb::{RocksDbBlockIndex, RocksDbConfig};

/// Storage-level error type shared by the backends.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying RocksDB error.
    RocksDb(::rocksdb::Error),
    /// Required column family was not found.
    MissingColumnFamily(&'static str),
    /// Corrupted or malformed metadata (e.g. a dangling last-block id).
    CorruptedMeta(&'static str),
    /// Attempted to persist a block whose id has not been derived.
    MissingBlockId,
    /// A stored block failed to decode.
    Encoding(String),
}

impl From<::rocksdb::Error> for StorageError {
    fn from(e: ::rocksdb::Error) -> Self {
        StorageError::RocksDb(e)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::RocksDb(e) => write!(f, "rocksdb error: {e}"),
            StorageError::MissingColumnFamily(cf) => write!(f, "missing column family: {cf}"),
            StorageError::CorruptedMeta(what) => write!(f, "corrupted metadata: {what}"),
            StorageError::MissingBlockId => f.write_str("block has no id to persist under"),
            StorageError::Encoding(msg) => write!(f, "block encoding error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display_variants() {
        assert_eq!(
            StorageError::MissingColumnFamily("blocks").to_string(),
            "missing column family: blocks"
        );
        assert_eq!(
            StorageError::MissingBlockId.to_string(),
            "block has no id to persist under"
        );
        assert_eq!(
            StorageError::Encoding("truncated".to_string()).to_string(),
            "block encoding error: truncated"
        );
    }
}
