//! Sequenced block processing pipeline.
//!
//! [`BlockProcessor::process_block`] takes a candidate block through the
//! full acceptance sequence: property normalisation, codec schema
//! normalisation, consensus verification, optional broadcast, duplicate
//! checks, delegate slot validation, per-transaction checks and finally
//! the hand-off to the chain-application collaborator. Every stage
//! aborts the pipeline on its first error.
//!
//! The processor also owns the lifecycle surface: the loaded gate that
//! refuses work before the node is bound, and the recent-block-id window
//! maintained in response to chain events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::consensus::config::ConsensusConfig;
use crate::consensus::context::{ChainContext, ForkCause};
use crate::consensus::error::ProcessError;
use crate::consensus::window::RecentBlockIds;
use crate::types::{Block, WireBlock};
use crate::validation::BlockVerifier;

/// Orchestrates block acceptance against the bound collaborators.
pub struct BlockProcessor {
    context: ChainContext,
    verifier: BlockVerifier,
    window: Arc<Mutex<RecentBlockIds>>,
    slot_window: usize,
    loaded: AtomicBool,
}

impl BlockProcessor {
    /// Builds a processor over the given collaborators.
    ///
    /// The processor starts out not loaded; call [`BlockProcessor::on_bind`]
    /// once the node has wired every module, after which
    /// [`BlockProcessor::process_block`] accepts work.
    pub fn new(config: ConsensusConfig, context: ChainContext) -> Self {
        let slot_window = config.block_slot_window;
        let window = Arc::new(Mutex::new(RecentBlockIds::new(slot_window)));
        let verifier = BlockVerifier::new(config, context.clone(), window.clone());

        Self {
            context,
            verifier,
            window,
            slot_window,
            loaded: AtomicBool::new(false),
        }
    }

    /// The verifier sharing this processor's recent-id window; use this
    /// for receipt-time verification of gossiped blocks.
    pub fn verifier(&self) -> &BlockVerifier {
        &self.verifier
    }

    /// Whether the processor has been bound and accepts work.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Marks the node as bound: all collaborators are wired and the
    /// pipeline may accept blocks.
    pub fn on_bind(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    /// Rebuilds the recent-id window from storage.
    ///
    /// Called once the blockchain is ready. Failures are logged and do
    /// not abort startup; the window then fills organically from new
    /// blocks.
    pub fn on_blockchain_ready(&self) {
        match self.context.index.load_last_block_ids(self.slot_window) {
            Ok(ids) => self.lock_window().fill(ids),
            Err(e) => {
                tracing::error!(error = %e, "failed to load recent block ids from storage");
            }
        }
    }

    /// Records a freshly accepted block in the recent-id window.
    pub fn on_new_block(&self, block: &Block) {
        match &block.id {
            Some(id) => self.lock_window().push(id.clone()),
            None => tracing::debug!("accepted block carries no id; window unchanged"),
        }
    }

    /// Runs the full acceptance pipeline over a candidate block.
    ///
    /// `broadcast` distinguishes locally forged blocks (which arrive
    /// fully populated and are re-broadcast in reduced form) from peer
    /// or replayed blocks (which arrive compact and are not broadcast).
    /// `save_block` is forwarded to the chain-application stage.
    pub fn process_block(
        &self,
        block: WireBlock,
        broadcast: bool,
        save_block: bool,
    ) -> Result<(), ProcessError> {
        if self.context.chain.is_cleaning() {
            return Err(ProcessError::CleaningUp);
        }
        if !self.is_loaded() {
            return Err(ProcessError::Loading);
        }

        // Peer blocks arrive compact and get canonical defaults filled;
        // locally forged blocks must already be fully populated.
        let mut block = if broadcast {
            Block::from_wire_strict(block).map_err(|e| ProcessError::Normalize(e.to_string()))?
        } else {
            Block::from_wire(block)
        };

        self.context
            .block_codec
            .object_normalize(&mut block)
            .map_err(|e| ProcessError::Normalize(e.to_string()))?;

        let receipt = self.verifier.verify_block(&mut block);
        if !receipt.verified {
            let first = receipt
                .first_error()
                .unwrap_or("Block verification failed")
                .to_string();
            return Err(ProcessError::Verification(first));
        }

        if broadcast {
            let reduced = block.to_reduced_wire();
            self.context
                .applier
                .broadcast_reduced_block(&reduced, broadcast);
        }

        // Id verification has run by now, so a missing id means the
        // codec is misbehaving rather than a malformed block.
        let id = block
            .id
            .clone()
            .ok_or_else(|| ProcessError::Verification("Failed to derive block id".to_string()))?;

        let exists = self
            .context
            .index
            .block_exists(&id)
            .map_err(|e| ProcessError::Storage(e.to_string()))?;
        if exists {
            return Err(ProcessError::AlreadyExists(id));
        }

        if let Err(e) = self.context.delegates.validate_block_slot(&block) {
            self.context.delegates.fork(&block, ForkCause::WrongSlotDelegate);
            return Err(ProcessError::DelegateSlot(e.to_string()));
        }

        self.check_transactions(&mut block)?;

        self.context
            .applier
            .apply_block(block, save_block)
            .map_err(|e| ProcessError::Apply(e.to_string()))
    }

    /// Per-transaction checks, strictly in block order.
    ///
    /// Later transactions may read state mutated by earlier ones in the
    /// same block, so these checks must not be reordered or parallelised.
    fn check_transactions(&self, block: &mut Block) -> Result<(), ProcessError> {
        for i in 0..block.transactions.len() {
            let id = self
                .context
                .transaction_codec
                .get_id(&block.transactions[i])
                .map_err(|e| ProcessError::Transaction(e.to_string()))?;
            block.transactions[i].id = Some(id.clone());
            let block_id = block.id.clone();
            block.transactions[i].block_id = block_id;

            let tx = block.transactions[i].clone();
            if let Err(err) = self.context.transaction_codec.check_confirmed(&tx) {
                // A confirmed duplicate is fork cause 2. The fork report
                // precedes the unconfirmed undo, which precedes the error.
                self.context
                    .delegates
                    .fork(block, ForkCause::DuplicateConfirmedTransaction);
                if let Err(undo_err) = self.context.pool.undo_unconfirmed(&tx) {
                    tracing::error!(
                        transaction = %id,
                        error = %undo_err,
                        "failed to undo unconfirmed transaction"
                    );
                }
                self.context.pool.remove_unconfirmed(&id);
                return Err(ProcessError::Transaction(err.to_string()));
            }

            // An absent account is a cold wallet: the codec decides
            // whether a missing sender is acceptable for this type.
            let sender = self
                .context
                .accounts
                .get_account(&tx.sender_public_key)
                .map_err(|e| ProcessError::Transaction(e.to_string()))?;
            self.context
                .transaction_codec
                .verify(&tx, sender.as_ref())
                .map_err(|e| ProcessError::Transaction(e.to_string()))?;
        }

        Ok(())
    }

    fn lock_window(&self) -> MutexGuard<'_, RecentBlockIds> {
        match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
