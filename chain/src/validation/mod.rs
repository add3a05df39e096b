//! Block verification.
//!
//! Verification is a sequence of independent predicates that each append
//! zero or more errors to a [`BlockReceipt`]. Two entry points exist on
//! [`verifier::BlockVerifier`]:
//!
//! - `verify_receipt`: applied to any incoming block at receipt time,
//!   including the anti-replay guards (recent-id window, slot window);
//! - `verify_block`: applied inside the processing pipeline, where the
//!   fork-one and strict slot-ordering checks replace the receipt-time
//!   guards.

pub mod verifier;

pub use verifier::BlockVerifier;

/// Outcome of running the verification predicates over a block.
///
/// `verified` holds iff no predicate recorded an error. The error list
/// is reversed before the receipt is returned, so the earliest-detected
/// error appears last; callers surface `errors[0]`, the last one
/// appended. Downstream consumers rely on that ordering.
#[derive(Clone, Debug, Default)]
pub struct BlockReceipt {
    /// Whether the block passed every predicate.
    pub verified: bool,
    /// Accumulated error messages, reversed (latest-detected first).
    pub errors: Vec<String>,
}

impl BlockReceipt {
    /// The error a caller should surface, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}
