// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - RocksDB-backed block index
// - In-binary dev codec (bincode 2 canonical bytes, SHA-256 ids,
//   ed25519 block signatures)
// - Delegate keypair loading from an encrypted forging secret
// - Prometheus metrics exporter on /metrics
// - Simple loop that forges (currently empty) blocks once per slot and
//   feeds them through the full processing pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use ed25519_dalek::{PublicKey as VerifyKey, Signature as DalekSignature, Signer, Verifier};
use tokio::signal;
use tokio::sync::watch;

use dpos_chain::{
    Account, Accounts, Block, BlockCodec, BlockId, BlockProcessor, ChainApplier, ChainConfig,
    ChainContext, ChainState, Delegates, ForgingConfig, ForkCause, Hash256, MetricsRegistry,
    ModuleError, PublicKey, RocksDbBlockIndex, Signature, Slots, Transaction, TransactionCodec,
    TransactionId, UnconfirmedPool, WireBlock, encrypt_entry, load_delegates,
};

/// Well-known dev forging secret; never use outside local devnets.
const DEV_SECRET: &str = "wagon stone tide hollow piano famous mimic shed celery pupil stereo lucky";
const DEV_PASSPHRASE: &str = "elephant bird parrots cow";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dpos_chain=info".to_string()),
        )
        .init();

    if let Err(err) = run_node().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    // Defaults plus a generated dev forging entry. Later this can come
    // from a file/CLI/env.
    let mut cfg = ChainConfig::default();
    cfg.forging = dev_forging_config().map_err(|e| format!("failed to build dev forging config: {e}"))?;

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    // The exporter winds down with the node: Ctrl-C flips this channel
    // alongside the cleaning flag.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if cfg.metrics.enabled {
        let registry = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = registry.serve(addr, rx).await {
                tracing::error!(error = %e, "metrics HTTP server error");
            }
        });
    }

    // ---------------------------
    // Storage backend (RocksDB)
    // ---------------------------

    let store = Arc::new(RocksDbBlockIndex::open(&cfg.storage).map_err(|e| {
        format!("failed to open RocksDB store at {}: {e}", cfg.storage.path)
    })?);

    // ---------------------------
    // Forging keypair
    // ---------------------------

    let accounts = Arc::new(DevAccounts::from_forging_config(&cfg.forging));
    let keypairs = load_delegates(&cfg.forging, accounts.as_ref())
        .map_err(|e| format!("failed to load forging delegates: {e}"))?;
    metrics.node.forging_keypairs.set(keypairs.len() as i64);

    let (forger_hex, forger_keypair) = keypairs
        .into_iter()
        .next()
        .ok_or_else(|| "no forging keypair available".to_string())?;
    let forger_public =
        PublicKey::from_hex(&forger_hex).map_err(|e| format!("bad forger key hex: {e}"))?;
    tracing::info!(public_key = %forger_hex, "forging as delegate");

    // ---------------------------
    // Genesis bootstrap
    // ---------------------------

    let codec = Arc::new(DevCodec);
    let last = match store
        .last_block()
        .map_err(|e| format!("failed to read last block: {e}"))?
    {
        Some(block) => block,
        None => {
            let mut genesis = genesis_block(&forger_public);
            let id = BlockCodec::get_id(&*codec, &genesis)
                .map_err(|e| format!("failed to derive genesis id: {e}"))?;
            genesis.id = Some(id);
            store
                .save_block(&genesis)
                .map_err(|e| format!("failed to save genesis block: {e}"))?;
            tracing::info!("genesis block written");
            genesis
        }
    };

    // ---------------------------
    // Node shell + processor
    // ---------------------------

    let shell = Arc::new(NodeShell {
        store: store.clone(),
        last: Mutex::new(last),
        cleaning: AtomicBool::new(false),
    });

    let context = ChainContext {
        chain: shell.clone(),
        index: store.clone(),
        delegates: Arc::new(DevDelegates {
            metrics: metrics.clone(),
        }),
        accounts: accounts.clone(),
        pool: Arc::new(NoopPool),
        applier: shell.clone(),
        block_codec: codec.clone(),
        transaction_codec: codec.clone(),
    };

    let processor = BlockProcessor::new(cfg.consensus.clone(), context);
    processor.on_bind();
    processor.on_blockchain_ready();

    // ---------------------------
    // Main forging loop
    // ---------------------------

    let slots = Slots::from_config(&cfg.consensus);
    let interval = Duration::from_secs(cfg.consensus.slot_interval_secs.max(1));
    tracing::info!(
        "forging loop running with slot interval {}s",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                shell.cleaning.store(true, Ordering::Release);
                let _ = shutdown_tx.send(true);
                tracing::info!("shutdown signal received, cleaning up");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let last = shell.last_block();
        let timestamp = slots.epoch_now();
        if slots.slot_of(timestamp) <= slots.slot_of(last.timestamp) {
            // Our slot has not advanced past the tip yet.
            continue;
        }

        let mut block = Block {
            id: None,
            version: 0,
            timestamp,
            height: last.height + 1,
            previous_block: last.id.clone(),
            number_of_transactions: 0,
            total_amount: 0,
            total_fee: 0,
            reward: cfg.consensus.rewards.reward_at(last.height + 1),
            payload_length: 0,
            payload_hash: Hash256::compute(&[]),
            generator_public_key: forger_public.clone(),
            block_signature: None,
            transactions: Vec::new(),
        };
        let signature = forger_keypair.sign(&signing_bytes(&block));
        block.block_signature = Some(Signature(signature.to_bytes().to_vec()));

        let start = Instant::now();
        match processor.process_block(block.to_wire(), true, true) {
            Ok(()) => {
                metrics
                    .node
                    .block_processing_seconds
                    .observe(start.elapsed().as_secs_f64());
                metrics.node.blocks_accepted.inc();

                let accepted = shell.last_block();
                processor.on_new_block(&accepted);
                tracing::info!(
                    height = accepted.height,
                    id = accepted.id.as_ref().map(BlockId::as_str).unwrap_or(""),
                    "forged block applied"
                );
            }
            Err(e) => {
                metrics.node.blocks_rejected.inc();
                tracing::warn!(error = %e, "failed to process forged block");
            }
        }
    }

    Ok(())
}

/// Builds the dev forging section: one encrypted entry derived from the
/// well-known dev secret.
fn dev_forging_config() -> Result<ForgingConfig, dpos_chain::ForgingError> {
    let entry = encrypt_entry(DEV_SECRET, DEV_PASSPHRASE)?;
    Ok(ForgingConfig {
        force: true,
        secret: Some(vec![entry]),
        default_passphrase: DEV_PASSPHRASE.to_string(),
    })
}

/// Height-1 block with no parent; everything else is canonical defaults.
fn genesis_block(generator: &PublicKey) -> Block {
    Block {
        id: None,
        version: 0,
        timestamp: 0,
        height: 1,
        previous_block: None,
        number_of_transactions: 0,
        total_amount: 0,
        total_fee: 0,
        reward: 0,
        payload_length: 0,
        payload_hash: Hash256::compute(&[]),
        generator_public_key: generator.clone(),
        block_signature: None,
        transactions: Vec::new(),
    }
}

/// Bytes a generator signs: the canonical block with id and signature
/// stripped. The dev codec verifies against the same bytes.
fn signing_bytes(block: &Block) -> Vec<u8> {
    let mut unsigned = block.clone();
    unsigned.id = None;
    unsigned.block_signature = None;
    unsigned.canonical_bytes()
}

/// Chain state + chain application over the RocksDB index.
struct NodeShell {
    store: Arc<RocksDbBlockIndex>,
    last: Mutex<Block>,
    cleaning: AtomicBool,
}

impl NodeShell {
    fn lock_last(&self) -> MutexGuard<'_, Block> {
        match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ChainState for NodeShell {
    fn last_block(&self) -> Block {
        self.lock_last().clone()
    }

    fn is_cleaning(&self) -> bool {
        self.cleaning.load(Ordering::Acquire)
    }
}

impl ChainApplier for NodeShell {
    fn apply_block(&self, block: Block, save_block: bool) -> Result<(), ModuleError> {
        if save_block {
            self.store
                .save_block(&block)
                .map_err(|e| ModuleError::new(e.to_string()))?;
        }
        *self.lock_last() = block;
        Ok(())
    }

    fn broadcast_reduced_block(&self, block: &WireBlock, _broadcast: bool) {
        // No gossip layer in the demo node.
        tracing::debug!(timestamp = block.timestamp, "skipping broadcast of reduced block");
    }
}

/// In-binary dev codec: canonical bytes are bincode 2, ids are SHA-256
/// digests of those bytes, block signatures are ed25519 over the
/// unsigned canonical form.
struct DevCodec;

impl BlockCodec for DevCodec {
    fn get_id(&self, block: &Block) -> Result<BlockId, ModuleError> {
        let mut stripped = block.clone();
        stripped.id = None;
        Ok(BlockId::new(
            Hash256::compute(&stripped.canonical_bytes()).to_hex(),
        ))
    }

    fn verify_signature(&self, block: &Block) -> Result<bool, ModuleError> {
        let Some(signature) = &block.block_signature else {
            return Ok(false);
        };
        let public = VerifyKey::from_bytes(block.generator_public_key.as_bytes())
            .map_err(|e| ModuleError::new(e.to_string()))?;
        let signature = DalekSignature::from_bytes(signature.as_bytes())
            .map_err(|e| ModuleError::new(e.to_string()))?;
        Ok(public.verify(&signing_bytes(block), &signature).is_ok())
    }

    fn object_normalize(&self, _block: &mut Block) -> Result<(), ModuleError> {
        Ok(())
    }
}

impl TransactionCodec for DevCodec {
    fn get_id(&self, tx: &Transaction) -> Result<TransactionId, ModuleError> {
        let bytes = self.get_bytes(tx)?;
        Ok(TransactionId::new(Hash256::compute(&bytes).to_hex()))
    }

    fn get_bytes(&self, tx: &Transaction) -> Result<Vec<u8>, ModuleError> {
        let mut stripped = tx.clone();
        stripped.id = None;
        stripped.block_id = None;
        bincode::serde::encode_to_vec(&stripped, bincode::config::standard())
            .map_err(|e| ModuleError::new(e.to_string()))
    }

    fn verify(&self, _tx: &Transaction, sender: Option<&Account>) -> Result<(), ModuleError> {
        // The demo forges empty blocks; transaction verification only
        // rejects cold wallets.
        if sender.is_none() {
            return Err(ModuleError::new("Sender account not found"));
        }
        Ok(())
    }

    fn check_confirmed(&self, _tx: &Transaction) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Delegate hooks: slot validation trusts the single dev delegate, fork
/// notifications land in the metrics and the log.
struct DevDelegates {
    metrics: Arc<MetricsRegistry>,
}

impl Delegates for DevDelegates {
    fn fork(&self, block: &Block, cause: ForkCause) {
        self.metrics
            .node
            .forks_observed
            .with_label_values(&[&cause.to_string()])
            .inc();
        tracing::warn!(
            cause = cause.code(),
            height = block.height,
            "fork observed"
        );
    }

    fn validate_block_slot(&self, _block: &Block) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Static account directory seeded from the forging configuration.
struct DevAccounts {
    accounts: Vec<Account>,
}

impl DevAccounts {
    fn from_forging_config(cfg: &ForgingConfig) -> Self {
        let accounts = cfg
            .secret
            .iter()
            .flatten()
            .filter_map(|entry| {
                let public_key = PublicKey::from_hex(&entry.public_key).ok()?;
                Some(Account {
                    address: format!("{}L", &entry.public_key[..16]),
                    public_key: Some(public_key),
                    balance: 0,
                    is_delegate: true,
                })
            })
            .collect();
        Self { accounts }
    }
}

impl Accounts for DevAccounts {
    fn get_account(&self, pk: &PublicKey) -> Result<Option<Account>, ModuleError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.public_key.as_ref() == Some(pk))
            .cloned())
    }
}

/// The demo node keeps no mempool.
struct NoopPool;

impl UnconfirmedPool for NoopPool {
    fn undo_unconfirmed(&self, _tx: &Transaction) -> Result<(), ModuleError> {
        Ok(())
    }

    fn remove_unconfirmed(&self, _id: &TransactionId) {}
}
