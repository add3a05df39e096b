use std::fmt;

use crate::types::BlockId;

/// Opaque error reported by a collaborator module or codec.
///
/// The pipeline does not interpret collaborator failures; it surfaces
/// their message text, so the `Display` form is the contract.
#[derive(Clone, Debug)]
pub struct ModuleError(String);

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        ModuleError(message.into())
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ModuleError {}

impl From<String> for ModuleError {
    fn from(message: String) -> Self {
        ModuleError(message)
    }
}

impl From<&str> for ModuleError {
    fn from(message: &str) -> Self {
        ModuleError(message.to_string())
    }
}

/// Errors surfaced by the block processing pipeline.
#[derive(Clone, Debug)]
pub enum ProcessError {
    /// The node is shutting down; no new blocks are accepted.
    CleaningUp,
    /// The pipeline has not been bound to its collaborators yet.
    Loading,
    /// Block failed schema normalisation.
    Normalize(String),
    /// Block failed verification; carries the first surfaced receipt error.
    Verification(String),
    /// Block id is already persisted.
    AlreadyExists(BlockId),
    /// Storage collaborator failure.
    Storage(String),
    /// The block's slot does not belong to its generator.
    DelegateSlot(String),
    /// A per-transaction check failed.
    Transaction(String),
    /// The chain-application stage failed.
    Apply(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::CleaningUp => f.write_str("Cleaning up"),
            ProcessError::Loading => f.write_str("Blockchain is loading"),
            ProcessError::AlreadyExists(id) => write!(f, "Block {id} already exists"),
            ProcessError::Normalize(msg)
            | ProcessError::Verification(msg)
            | ProcessError::Storage(msg)
            | ProcessError::DelegateSlot(msg)
            | ProcessError::Transaction(msg)
            | ProcessError::Apply(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ProcessError {}
