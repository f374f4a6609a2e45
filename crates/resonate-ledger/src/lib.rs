//! # resonate-ledger
//!
//! The Split Ledger: per-draft revenue-split accounting in basis points.
//!
//! A ledger is just the draft's `Vec<Split>`; every operation here takes the
//! current splits by reference and returns a replacement vector, so callers
//! swap the whole ledger in one assignment and no reader ever observes a
//! half-applied mutation.
//!
//! The `sum(weights) + PLATFORM_FEE_BPS == 10000` invariant is checked only
//! at the publish boundary ([`is_complete`]); a ledger is allowed to sit in
//! an incomplete state for as long as the user keeps editing.
//!
//! ## Modules
//!
//! - [`splits`] — reconciliation, weight edits, totals

pub mod splits;

pub use splits::{is_complete, reconcile_missing, remove_recipient, set_weight, total_bps};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// A weight outside the storable range was submitted.
    #[error("split weight out of range: {weight}")]
    InvalidWeight {
        /// The rejected value.
        weight: i64,
    },
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, SplitError>;
