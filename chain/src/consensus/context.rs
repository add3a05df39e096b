//! Collaborator contracts consumed by the verification core.
//!
//! The pipeline never owns chain state, accounts, the mempool or the
//! codec; it talks to them through the small traits below. A node shell
//! implements these over its real modules and hands the bundle to the
//! processor as a [`ChainContext`].
//!
//! All traits are object-safe and take `&self`: implementations that
//! mutate (stores, pools) use interior mutability, which also keeps them
//! sound if the host chooses a multi-threaded executor.

use std::fmt;
use std::sync::Arc;

use crate::consensus::error::ModuleError;
use crate::types::{Account, Block, BlockId, PublicKey, Transaction, TransactionId, WireBlock};

/// Classified consensus violation reported to the delegates module.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ForkCause {
    /// The candidate's previous-block id does not match the local tip.
    PreviousBlockMismatch,
    /// A transaction in the candidate is already confirmed on chain.
    DuplicateConfirmedTransaction,
    /// The candidate's slot does not belong to its generator.
    WrongSlotDelegate,
}

impl ForkCause {
    /// Numeric code used by the delegate accounting tables.
    pub fn code(self) -> u8 {
        match self {
            ForkCause::PreviousBlockMismatch => 1,
            ForkCause::DuplicateConfirmedTransaction => 2,
            ForkCause::WrongSlotDelegate => 3,
        }
    }
}

impl fmt::Display for ForkCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot view of the local chain maintained by the blocks module.
pub trait ChainState: Send + Sync {
    /// Current tip of the local chain.
    fn last_block(&self) -> Block;

    /// Monotonic shutdown flag; once set, the pipeline refuses new work.
    fn is_cleaning(&self) -> bool;
}

/// Persistent block index queried during processing.
pub trait BlockIndex: Send + Sync {
    /// Whether a block with this id is already persisted.
    fn block_exists(&self, id: &BlockId) -> Result<bool, ModuleError>;

    /// Ids of the `n` most recently persisted blocks, oldest first.
    fn load_last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, ModuleError>;
}

/// Hooks into the delegates module.
pub trait Delegates: Send + Sync {
    /// Records a classified consensus violation for delegate accounting.
    fn fork(&self, block: &Block, cause: ForkCause);

    /// Errors unless the block's slot belongs to its generator key.
    fn validate_block_slot(&self, block: &Block) -> Result<(), ModuleError>;
}

/// Read access to the accounts module.
pub trait Accounts: Send + Sync {
    /// Fetches an account by public key. `Ok(None)` means the account is
    /// not materialised yet (a cold wallet), which is not an error.
    fn get_account(&self, public_key: &PublicKey) -> Result<Option<Account>, ModuleError>;
}

/// Mempool operations used when a confirmed duplicate is detected.
pub trait UnconfirmedPool: Send + Sync {
    /// Rolls back the unconfirmed effects of `tx`.
    fn undo_unconfirmed(&self, tx: &Transaction) -> Result<(), ModuleError>;

    /// Drops `id` from the unconfirmed pool.
    fn remove_unconfirmed(&self, id: &TransactionId);
}

/// Chain-application stage: persists an accepted block and advances the
/// tip; also the outbound path for freshly forged blocks.
pub trait ChainApplier: Send + Sync {
    /// Applies `block` to persistent state. `save_block` controls
    /// whether the block itself is written (replay paths pass `false`).
    fn apply_block(&self, block: Block, save_block: bool) -> Result<(), ModuleError>;

    /// Hands a reduced block to the broadcaster.
    fn broadcast_reduced_block(&self, block: &WireBlock, broadcast: bool);
}

/// Block wire codec: id derivation, signature check, schema
/// normalisation. The encoding itself is defined elsewhere.
pub trait BlockCodec: Send + Sync {
    /// Derives the block id from the canonical bytes.
    fn get_id(&self, block: &Block) -> Result<BlockId, ModuleError>;

    /// Checks the generator signature. `Ok(false)` means a well-formed
    /// but invalid signature; `Err` means the check could not run.
    fn verify_signature(&self, block: &Block) -> Result<bool, ModuleError>;

    /// Applies schema normalisation to an inbound block.
    fn object_normalize(&self, block: &mut Block) -> Result<(), ModuleError>;
}

/// Transaction wire codec and confirmed-store checks.
pub trait TransactionCodec: Send + Sync {
    /// Derives the transaction id from the canonical bytes.
    fn get_id(&self, tx: &Transaction) -> Result<TransactionId, ModuleError>;

    /// Canonical bytes of the transaction, as committed to by the block
    /// payload hash.
    fn get_bytes(&self, tx: &Transaction) -> Result<Vec<u8>, ModuleError>;

    /// Full transaction verification against the sender account.
    /// `sender` is `None` for cold wallets.
    fn verify(&self, tx: &Transaction, sender: Option<&Account>) -> Result<(), ModuleError>;

    /// Errors if the transaction already exists in the confirmed store.
    fn check_confirmed(&self, tx: &Transaction) -> Result<(), ModuleError>;
}

/// Bundle of collaborator handles passed to the processor at
/// construction.
///
/// Cloning is cheap: every field is an `Arc`.
#[derive(Clone)]
pub struct ChainContext {
    pub chain: Arc<dyn ChainState>,
    pub index: Arc<dyn BlockIndex>,
    pub delegates: Arc<dyn Delegates>,
    pub accounts: Arc<dyn Accounts>,
    pub pool: Arc<dyn UnconfirmedPool>,
    pub applier: Arc<dyn ChainApplier>,
    pub block_codec: Arc<dyn BlockCodec>,
    pub transaction_codec: Arc<dyn TransactionCodec>,
}
