//! Transaction record carried inside blocks.
//!
//! The verification core treats transactions as mostly opaque: it reads
//! the identifier, sender key, amount and fee, and defers byte-level
//! encoding, signature checks and confirmed-store lookups to the
//! transaction codec collaborator.

use serde::{Deserialize, Serialize};

use super::{BlockId, PublicKey, Signature, TransactionId};

/// A single transaction as it appears in a block or in the mempool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Codec-derived identifier. Recomputed (and assigned) by the
    /// processing pipeline before per-transaction checks run, so it may
    /// be absent on freshly received objects.
    pub id: Option<TransactionId>,

    /// Identifier of the block this transaction was included in.
    ///
    /// Assigned by the processing pipeline once the containing block's
    /// own id is known.
    pub block_id: Option<BlockId>,

    /// Seconds since the chain epoch at which the transaction was made.
    pub timestamp: u64,

    /// Public key of the sending account.
    pub sender_public_key: PublicKey,

    /// Transferred amount, in base units.
    pub amount: u64,

    /// Fee paid to the forger, in base units.
    pub fee: u64,

    /// Sender's signature over the canonical encoding.
    pub signature: Signature,
}
