//! Verification predicates for candidate blocks.
//!
//! The verifier is stateless apart from the collaborator handles it was
//! constructed with: `verified` is a pure function of the candidate and
//! the current tip, while the error list preserves detection order
//! (reversed on return, see [`BlockReceipt`]).
//!
//! Two predicate sequences are exposed:
//!
//! - [`BlockVerifier::verify_receipt`] for opportunistically received
//!   blocks, with the recent-id and slot-window anti-replay guards;
//! - [`BlockVerifier::verify_block`] for the processing pipeline, with
//!   fork-one classification and strict slot ordering against the tip.
//!
//! Both assign the candidate's height from the tip before running and
//! fill the candidate's id as a side effect of id verification.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::consensus::config::ConsensusConfig;
use crate::consensus::context::{ChainContext, ForkCause};
use crate::consensus::slots::Slots;
use crate::consensus::window::RecentBlockIds;
use crate::types::{Block, BlockId};
use crate::validation::BlockReceipt;

/// Runs the consensus verification predicates over candidate blocks.
pub struct BlockVerifier {
    config: ConsensusConfig,
    slots: Slots,
    reward_exceptions: HashSet<String>,
    context: ChainContext,
    window: Arc<Mutex<RecentBlockIds>>,
}

impl BlockVerifier {
    pub fn new(
        config: ConsensusConfig,
        context: ChainContext,
        window: Arc<Mutex<RecentBlockIds>>,
    ) -> Self {
        let slots = Slots::from_config(&config);
        let reward_exceptions = config.reward_exceptions.iter().cloned().collect();
        Self {
            config,
            slots,
            reward_exceptions,
            context,
            window,
        }
    }

    /// Receipt-time verification of an incoming block.
    ///
    /// Assigns `block.height` relative to the current tip, then runs the
    /// stateless predicates plus the recent-id and slot-window guards.
    pub fn verify_receipt(&self, block: &mut Block) -> BlockReceipt {
        let last = self.context.chain.last_block();
        let mut errors = Vec::new();

        set_height(block, &last);
        self.verify_signature(block, &mut errors);
        self.verify_previous_block(block, &mut errors);
        self.verify_against_recent_ids(block, &mut errors);
        self.verify_block_slot_window(block, &mut errors);
        self.verify_version(block, &mut errors);
        self.verify_reward(block, &mut errors);
        self.verify_id(block, &mut errors);
        self.verify_payload(block, &mut errors);

        finish(errors)
    }

    /// Pipeline verification of a candidate about to extend the chain.
    ///
    /// Omits the receipt-time anti-replay guards and instead classifies
    /// previous-block mismatches as fork cause 1 and enforces strict
    /// slot ordering against the tip.
    pub fn verify_block(&self, block: &mut Block) -> BlockReceipt {
        let last = self.context.chain.last_block();
        let mut errors = Vec::new();

        set_height(block, &last);
        self.verify_signature(block, &mut errors);
        self.verify_previous_block(block, &mut errors);
        self.verify_version(block, &mut errors);
        self.verify_reward(block, &mut errors);
        self.verify_id(block, &mut errors);
        self.verify_payload(block, &mut errors);
        self.verify_fork_one(block, &last, &mut errors);
        self.verify_block_slot(block, &last, &mut errors);

        finish(errors)
    }

    fn verify_signature(&self, block: &Block, errors: &mut Vec<String>) {
        let mut valid = false;
        match self.context.block_codec.verify_signature(block) {
            Ok(v) => valid = v,
            Err(e) => errors.push(e.to_string()),
        }
        if !valid {
            errors.push("Failed to verify block signature".to_string());
        }
    }

    fn verify_previous_block(&self, block: &Block, errors: &mut Vec<String>) {
        if block.previous_block.is_none() && block.height != 1 {
            errors.push("Invalid previous block".to_string());
        }
    }

    fn verify_against_recent_ids(&self, block: &Block, errors: &mut Vec<String>) {
        if let Some(id) = &block.id {
            if self.lock_window().contains(id) {
                errors.push("Block already exists in chain".to_string());
            }
        }
    }

    fn verify_block_slot_window(&self, block: &Block, errors: &mut Vec<String>) {
        let slot = self.slots.slot_of(block.timestamp) as i64;
        let current = self.slots.current_slot() as i64;

        if current - slot > self.config.block_slot_window as i64 {
            errors.push("Block slot is too old".to_string());
        }
        if current < slot {
            errors.push("Block slot is in the future".to_string());
        }
    }

    fn verify_version(&self, block: &Block, errors: &mut Vec<String>) {
        if block.version > 0 {
            errors.push("Invalid block version".to_string());
        }
    }

    fn verify_reward(&self, block: &Block, errors: &mut Vec<String>) {
        let expected = self.config.rewards.reward_at(block.height);
        let exempt = block
            .id
            .as_ref()
            .is_some_and(|id| self.reward_exceptions.contains(id.as_str()));

        if block.height != 1 && block.reward != expected && !exempt {
            errors.push(format!(
                "Invalid block reward: {} expected: {}",
                block.reward, expected
            ));
        }
    }

    fn verify_id(&self, block: &mut Block, errors: &mut Vec<String>) {
        match self.context.block_codec.get_id(block) {
            Ok(id) => block.id = Some(id),
            Err(e) => errors.push(e.to_string()),
        }
    }

    fn verify_payload(&self, block: &Block, errors: &mut Vec<String>) {
        if block.payload_length > self.config.max_payload_length {
            errors.push("Payload length is too long".to_string());
        }
        if block.transactions.len() != block.number_of_transactions as usize {
            errors.push("Included transactions do not match block transactions count".to_string());
        }
        if block.transactions.len() > self.config.max_txs_per_block {
            errors.push("Number of transactions exceeds maximum per block".to_string());
        }

        let mut total_amount: u64 = 0;
        let mut total_fee: u64 = 0;
        let mut hasher = Sha256::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for tx in &block.transactions {
            let mut bytes = None;
            match self.context.transaction_codec.get_bytes(tx) {
                Ok(b) => bytes = Some(b),
                Err(e) => errors.push(e.to_string()),
            }

            if let Some(id) = &tx.id {
                if !seen.insert(id.as_str()) {
                    errors.push(format!("Encountered duplicate transaction: {id}"));
                }
            }

            if let Some(bytes) = bytes {
                hasher.update(&bytes);
            }
            total_amount = total_amount.saturating_add(tx.amount);
            total_fee = total_fee.saturating_add(tx.fee);
        }

        if hasher.finalize().as_slice() != block.payload_hash.as_bytes() {
            errors.push("Invalid payload hash".to_string());
        }
        if total_amount != block.total_amount {
            errors.push("Invalid total amount".to_string());
        }
        if total_fee != block.total_fee {
            errors.push("Invalid total fee".to_string());
        }
    }

    fn verify_fork_one(&self, block: &Block, last: &Block, errors: &mut Vec<String>) {
        if let Some(prev) = &block.previous_block {
            if Some(prev) != last.id.as_ref() {
                self.context
                    .delegates
                    .fork(block, ForkCause::PreviousBlockMismatch);
                let expected = last.id.as_ref().map(BlockId::as_str).unwrap_or_default();
                errors.push(format!(
                    "Invalid previous block: {prev} expected: {expected}"
                ));
            }
        }
    }

    fn verify_block_slot(&self, block: &Block, last: &Block, errors: &mut Vec<String>) {
        let block_slot = self.slots.slot_of(block.timestamp);
        let last_slot = self.slots.slot_of(last.timestamp);

        if block_slot > self.slots.current_slot() || block_slot <= last_slot {
            errors.push("Invalid block timestamp".to_string());
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, RecentBlockIds> {
        match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Assigns the candidate's height relative to the current tip.
fn set_height(block: &mut Block, last: &Block) {
    block.height = last.height + 1;
}

/// Seals a receipt: `verified` iff no errors, list reversed so the
/// earliest-detected error comes last.
fn finish(mut errors: Vec<String>) -> BlockReceipt {
    let verified = errors.is_empty();
    errors.reverse();
    BlockReceipt { verified, errors }
}
