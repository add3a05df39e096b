//! Consensus core.
//!
//! This module groups everything consensus-critical:
//!
//! - protocol constants ([`config::ConsensusConfig`]),
//! - slot arithmetic ([`slots::Slots`]),
//! - the forging reward schedule ([`rewards::RewardSchedule`]),
//! - the recent-block-id window ([`window::RecentBlockIds`]),
//! - collaborator contracts ([`context`]),
//! - error types ([`error`]),
//! - and the sequenced processing pipeline
//!   ([`processor::BlockProcessor`]).

pub mod config;
pub mod context;
pub mod error;
pub mod processor;
pub mod rewards;
pub mod slots;
pub mod window;

pub use config::ConsensusConfig;
pub use context::{
    Accounts, BlockCodec, BlockIndex, ChainApplier, ChainContext, ChainState, Delegates,
    ForkCause, TransactionCodec, UnconfirmedPool,
};
pub use error::{ModuleError, ProcessError};
pub use processor::BlockProcessor;
pub use rewards::RewardSchedule;
pub use slots::Slots;
pub use window::RecentBlockIds;
