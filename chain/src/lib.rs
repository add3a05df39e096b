//! Chain library crate.
//!
//! This crate provides the block verification and processing core of a
//! delegated-proof-of-stake chain node:
//!
//! - strongly-typed domain types (`types`),
//! - slot arithmetic, reward schedule, recent-id window, collaborator
//!   contracts and the sequenced processing pipeline (`consensus`),
//! - receipt- and process-time verification predicates (`validation`),
//! - the delegate keypair loader for encrypted forging secrets
//!   (`forging`),
//! - storage backends (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries compose these pieces into validator nodes,
//! simulators and experiment harnesses; the wire codec for blocks and
//! transactions stays behind the `consensus::context` traits and is
//! supplied by the host.

pub mod config;
pub mod consensus;
pub mod forging;
pub mod metrics;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export top-level configuration types.
pub use config::{ChainConfig, MetricsConfig};

// Re-export "core" consensus types and traits.
pub use consensus::{
    Accounts, BlockCodec, BlockIndex, BlockProcessor, ChainApplier, ChainContext, ChainState,
    ConsensusConfig, Delegates, ForkCause, ModuleError, ProcessError, RecentBlockIds,
    RewardSchedule, Slots, TransactionCodec, UnconfirmedPool,
};

// Re-export verification surfaces.
pub use validation::{BlockReceipt, BlockVerifier};

// Re-export the forging loader.
pub use forging::{EncryptedEntry, ForgingConfig, ForgingError, encrypt_entry, load_delegates};

// Re-export storage backends.
pub use storage::{InMemoryBlockIndex, RocksDbBlockIndex, RocksDbConfig, StorageError};

// Re-export metrics registry and node metrics.
pub use metrics::{MetricsRegistry, NodeMetrics};

// Re-export domain types at the crate root for convenience.
pub use types::*;
