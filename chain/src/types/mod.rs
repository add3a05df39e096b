//! Core domain types used by the chain.
//!
//! This module defines strongly-typed identifiers, key material wrappers
//! and account records shared across the verification and processing
//! layers. The goal is to avoid "naked" strings and byte buffers in
//! public APIs and instead use domain-specific newtypes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Block records: the fully-specified [`Block`] and the compact
/// [`WireBlock`] broadcast form.
pub mod block;

/// Transaction record carried inside blocks.
pub mod tx;

pub use block::{Block, WireBlock};
pub use tx::Transaction;

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit digest (SHA-256).
///
/// Used wherever the protocol carries a fixed-size digest, most notably
/// the block payload hash, which commits to the canonical bytes of every
/// transaction in the block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    /// Returns the underlying 32-byte digest as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Hex-encodes the digest (lowercase, 64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Opaque block identifier.
///
/// Block ids are derived by the block codec from the block's canonical
/// bytes; the core treats them as opaque strings and only ever compares
/// them for equality.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        BlockId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque transaction identifier, derived by the transaction codec.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public key bytes, wrapped to avoid naked `Vec<u8>`.
///
/// The core does not interpret key material; signature checks live in
/// the codec and the forging loader. Keys are compared byte-wise and
/// rendered as lowercase hex.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    /// Returns the raw public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encodes the key (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses a hex-encoded public key.
    pub fn from_hex(data: &str) -> Result<Self, hex::FromHexError> {
        Ok(PublicKey(hex::decode(data)?))
    }
}

/// Signature bytes as produced by the signing scheme in use.
///
/// Detached signatures over canonical encodings; the exact encoding is
/// defined by the codec layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Account record as surfaced by the accounts collaborator.
///
/// Only the fields the verification core consults are modelled here; the
/// accounts module owns the full ledger state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Ledger address of the account.
    pub address: String,
    /// Registered public key, if the account has ever signed.
    pub public_key: Option<PublicKey>,
    /// Confirmed balance, in base units.
    pub balance: u64,
    /// Whether the account is registered as an active block producer.
    pub is_delegate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash256_compute_is_deterministic_sha256() {
        let h1 = Hash256::compute(b"abc");
        let h2 = Hash256::compute(b"abc");
        assert_eq!(h1, h2);
        // Well-known SHA-256 test vector for "abc".
        assert_eq!(
            h1.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn block_id_displays_its_inner_string() {
        let id = BlockId::new("13191140260435645922");
        assert_eq!(id.to_string(), "13191140260435645922");
        assert_eq!(id.as_str(), "13191140260435645922");
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = PublicKey(vec![0xde, 0xad, 0xbe, 0xef]);
        let parsed = PublicKey::from_hex(&pk.to_hex()).expect("valid hex");
        assert_eq!(parsed, pk);
    }

    #[test]
    fn public_key_from_hex_rejects_garbage() {
        assert!(PublicKey::from_hex("not-hex").is_err());
    }
}
