use crate::consensus::rewards::RewardSchedule;

/// Consensus configuration parameters.
///
/// Every field here is part of the consensus contract: nodes that
/// disagree on any of these values will fork away from each other.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Number of recent slots within which a block is still acceptable
    /// on receipt; also the capacity of the recent-block-id window.
    pub block_slot_window: usize,
    /// Hard limit on the serialized transaction payload of a block, in bytes.
    pub max_payload_length: u32,
    /// Hard limit on the number of transactions per block.
    pub max_txs_per_block: usize,
    /// Duration of one forging slot, in seconds.
    pub slot_interval_secs: u64,
    /// Unix timestamp of the chain epoch; block timestamps count from here.
    pub epoch_unix_secs: u64,
    /// Milestone table for the forging reward.
    pub rewards: RewardSchedule,
    /// Block ids exempt from the reward check.
    ///
    /// Historical blocks whose reward deviates from the schedule but
    /// which are already part of the canonical chain.
    pub reward_exceptions: Vec<String>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_slot_window: 5,
            max_payload_length: 1_048_576,
            max_txs_per_block: 25,
            slot_interval_secs: 10,
            epoch_unix_secs: 1_600_000_000,
            rewards: RewardSchedule::default(),
            reward_exceptions: Vec::new(),
        }
    }
}
