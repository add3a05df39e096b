//! Block records and wire-form normalisation.
//!
//! Two representations exist:
//!
//! - [`Block`]: the fully-specified record the verifier and pipeline
//!   operate on. Every defaultable field holds a concrete value.
//! - [`WireBlock`]: the compact form exchanged with peers, where fields
//!   equal to their canonical default are omitted.
//!
//! Conversion between the two is lossless for populated fields:
//! [`Block::from_wire`] fills canonical defaults on the way in and
//! [`Block::to_reduced_wire`] strips them on the way out.
//!
//! Canonical bytes use **bincode 2** with the `serde` integration and an
//! explicit `standard()` config, the same encoding used for persistence.

use serde::{Deserialize, Serialize};

use super::{BlockId, Hash256, PublicKey, Signature, Transaction};

/// Fully-specified block record.
///
/// `id` stays `None` until id verification derives it from the canonical
/// bytes; `previous_block` is absent only on the genesis block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Codec-derived identifier, filled during verification.
    pub id: Option<BlockId>,
    /// Protocol version; the current protocol accepts only `0`.
    pub version: u32,
    /// Seconds since the chain epoch at which the block was forged.
    pub timestamp: u64,
    /// 1-based chain height; assigned relative to the local tip before
    /// verification.
    pub height: u64,
    /// Identifier of the parent block; absent iff `height == 1`.
    pub previous_block: Option<BlockId>,
    /// Number of transactions included; must match `transactions.len()`.
    pub number_of_transactions: u32,
    /// Sum of all transaction amounts, in base units.
    pub total_amount: u64,
    /// Sum of all transaction fees, in base units.
    pub total_fee: u64,
    /// Forging reward claimed by the generator, in base units.
    pub reward: u64,
    /// Total serialized length of the transaction payload, in bytes.
    pub payload_length: u32,
    /// SHA-256 digest over the concatenated canonical transaction bytes.
    pub payload_hash: Hash256,
    /// Public key of the delegate that forged the block.
    pub generator_public_key: PublicKey,
    /// Generator's signature over the block header bytes.
    pub block_signature: Option<Signature>,
    /// Ordered transaction list.
    pub transactions: Vec<Transaction>,
}

/// Compact block form used on the wire.
///
/// Fields that equal their canonical default (`0` or an empty list) are
/// omitted; everything else is carried verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_block: Option<BlockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_transactions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_length: Option<u32>,
    pub payload_hash: Hash256,
    pub generator_public_key: PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_signature: Option<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

/// Error returned when a wire block that must be fully populated is
/// missing one of the defaultable properties.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingProperty(pub &'static str);

impl std::fmt::Display for MissingProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block is missing property: {}", self.0)
    }
}

impl std::error::Error for MissingProperty {}

impl Block {
    /// Fills canonical defaults on a compact wire block.
    ///
    /// `number_of_transactions` defaults to the length of the carried
    /// transaction list when one is present, otherwise to `0`. Repeated
    /// application through [`Block::to_wire`] is a no-op: filling is
    /// idempotent.
    pub fn from_wire(wire: WireBlock) -> Self {
        let transactions = wire.transactions.unwrap_or_default();
        let number_of_transactions = wire
            .number_of_transactions
            .unwrap_or(transactions.len() as u32);

        Block {
            id: wire.id,
            version: wire.version.unwrap_or(0),
            timestamp: wire.timestamp,
            height: wire.height.unwrap_or(0),
            previous_block: wire.previous_block,
            number_of_transactions,
            total_amount: wire.total_amount.unwrap_or(0),
            total_fee: wire.total_fee.unwrap_or(0),
            reward: wire.reward.unwrap_or(0),
            payload_length: wire.payload_length.unwrap_or(0),
            payload_hash: wire.payload_hash,
            generator_public_key: wire.generator_public_key,
            block_signature: wire.block_signature,
            transactions,
        }
    }

    /// Converts a wire block without filling defaults.
    ///
    /// Used on the locally-forged path, where blocks are expected to
    /// arrive fully populated; an omitted defaultable field is an error
    /// rather than an implicit zero.
    pub fn from_wire_strict(wire: WireBlock) -> Result<Self, MissingProperty> {
        let version = wire.version.ok_or(MissingProperty("version"))?;
        let height = wire.height.ok_or(MissingProperty("height"))?;
        let number_of_transactions = wire
            .number_of_transactions
            .ok_or(MissingProperty("numberOfTransactions"))?;
        let total_amount = wire.total_amount.ok_or(MissingProperty("totalAmount"))?;
        let total_fee = wire.total_fee.ok_or(MissingProperty("totalFee"))?;
        let reward = wire.reward.ok_or(MissingProperty("reward"))?;
        let payload_length = wire.payload_length.ok_or(MissingProperty("payloadLength"))?;
        let transactions = wire.transactions.ok_or(MissingProperty("transactions"))?;

        Ok(Block {
            id: wire.id,
            version,
            timestamp: wire.timestamp,
            height,
            previous_block: wire.previous_block,
            number_of_transactions,
            total_amount,
            total_fee,
            reward,
            payload_length,
            payload_hash: wire.payload_hash,
            generator_public_key: wire.generator_public_key,
            block_signature: wire.block_signature,
            transactions,
        })
    }

    /// Lossless conversion to the wire form: every field populated.
    pub fn to_wire(&self) -> WireBlock {
        WireBlock {
            id: self.id.clone(),
            version: Some(self.version),
            timestamp: self.timestamp,
            height: Some(self.height),
            previous_block: self.previous_block.clone(),
            number_of_transactions: Some(self.number_of_transactions),
            total_amount: Some(self.total_amount),
            total_fee: Some(self.total_fee),
            reward: Some(self.reward),
            payload_length: Some(self.payload_length),
            payload_hash: self.payload_hash,
            generator_public_key: self.generator_public_key.clone(),
            block_signature: self.block_signature.clone(),
            transactions: Some(self.transactions.clone()),
        }
    }

    /// Compact conversion for broadcast: fields equal to their canonical
    /// default are stripped.
    pub fn to_reduced_wire(&self) -> WireBlock {
        let strip_u32 = |v: u32| if v == 0 { None } else { Some(v) };
        let strip_u64 = |v: u64| if v == 0 { None } else { Some(v) };

        WireBlock {
            id: self.id.clone(),
            version: strip_u32(self.version),
            timestamp: self.timestamp,
            height: Some(self.height),
            previous_block: self.previous_block.clone(),
            number_of_transactions: strip_u32(self.number_of_transactions),
            total_amount: strip_u64(self.total_amount),
            total_fee: strip_u64(self.total_fee),
            reward: strip_u64(self.reward),
            payload_length: strip_u32(self.payload_length),
            payload_hash: self.payload_hash,
            generator_public_key: self.generator_public_key.clone(),
            block_signature: self.block_signature.clone(),
            transactions: if self.transactions.is_empty() {
                None
            } else {
                Some(self.transactions.clone())
            },
        }
    }

    /// Returns the canonical byte representation of this block.
    ///
    /// Bincode 2 with the `standard()` configuration and the `serde`
    /// integration. All hashing, id derivation and persistence that
    /// depend on a "canonical" form go through this method.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which would be a programming error:
    /// every field is serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("Block should always be serializable with bincode 2 + serde")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HASH_LEN;

    fn dummy_hash(byte: u8) -> Hash256 {
        Hash256([byte; HASH_LEN])
    }

    fn compact_wire() -> WireBlock {
        WireBlock {
            id: None,
            version: None,
            timestamp: 12_340,
            height: None,
            previous_block: Some(BlockId::new("100")),
            number_of_transactions: None,
            total_amount: None,
            total_fee: None,
            reward: None,
            payload_length: None,
            payload_hash: dummy_hash(1),
            generator_public_key: PublicKey(vec![2u8; 32]),
            block_signature: Some(Signature(vec![3u8; 64])),
            transactions: None,
        }
    }

    #[test]
    fn from_wire_fills_canonical_defaults() {
        let block = Block::from_wire(compact_wire());

        assert_eq!(block.version, 0);
        assert_eq!(block.height, 0);
        assert_eq!(block.number_of_transactions, 0);
        assert_eq!(block.total_amount, 0);
        assert_eq!(block.total_fee, 0);
        assert_eq!(block.reward, 0);
        assert_eq!(block.payload_length, 0);
        assert!(block.transactions.is_empty());
        assert_eq!(block.previous_block, Some(BlockId::new("100")));
    }

    #[test]
    fn from_wire_counts_carried_transactions() {
        let mut wire = compact_wire();
        wire.transactions = Some(vec![
            Transaction {
                id: None,
                block_id: None,
                timestamp: 0,
                sender_public_key: PublicKey(vec![9u8; 32]),
                amount: 5,
                fee: 1,
                signature: Signature(vec![0u8; 64]),
            };
            3
        ]);

        let block = Block::from_wire(wire);
        assert_eq!(block.number_of_transactions, 3);
        assert_eq!(block.transactions.len(), 3);
    }

    #[test]
    fn strip_after_fill_is_identity_on_defaults() {
        let wire = compact_wire();
        let reduced = Block::from_wire(wire.clone()).to_reduced_wire();

        assert_eq!(reduced.version, None);
        assert_eq!(reduced.number_of_transactions, None);
        assert_eq!(reduced.total_amount, None);
        assert_eq!(reduced.total_fee, None);
        assert_eq!(reduced.reward, None);
        assert_eq!(reduced.payload_length, None);
        assert!(reduced.transactions.is_none());
        assert_eq!(reduced.timestamp, wire.timestamp);
        assert_eq!(reduced.previous_block, wire.previous_block);
        assert_eq!(reduced.payload_hash, wire.payload_hash);
    }

    #[test]
    fn fill_is_idempotent() {
        let once = Block::from_wire(compact_wire());
        let twice = Block::from_wire(once.to_wire());

        assert_eq!(once.version, twice.version);
        assert_eq!(once.height, twice.height);
        assert_eq!(once.number_of_transactions, twice.number_of_transactions);
        assert_eq!(once.total_amount, twice.total_amount);
        assert_eq!(once.total_fee, twice.total_fee);
        assert_eq!(once.reward, twice.reward);
        assert_eq!(once.payload_length, twice.payload_length);
        assert_eq!(once.transactions.len(), twice.transactions.len());
    }

    #[test]
    fn from_wire_strict_rejects_missing_fields() {
        let err = Block::from_wire_strict(compact_wire()).unwrap_err();
        assert_eq!(err, MissingProperty("version"));
        assert!(err.to_string().contains("missing property"));
    }

    #[test]
    fn from_wire_strict_accepts_fully_populated_blocks() {
        let full = Block::from_wire(compact_wire()).to_wire();
        let block = Block::from_wire_strict(full).expect("fully populated");
        assert_eq!(block.version, 0);
        assert_eq!(block.reward, 0);
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let block = Block::from_wire(compact_wire());
        assert_eq!(block.canonical_bytes(), block.canonical_bytes());
    }
}
