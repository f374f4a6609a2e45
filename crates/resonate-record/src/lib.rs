//! # resonate-record
//!
//! The Release Record Builder: deterministically turns a validated
//! `{draft, ledger}` pair into the immutable kind-31337 record that gets
//! signed and broadcast. Pure functions, no I/O.
//!
//! ## Modules
//!
//! - [`builder`] — tag assembly and validation
//! - [`signed`] — the signed-record envelope

pub mod builder;
pub mod signed;

pub use builder::{build, ReleaseRecord};
pub use signed::SignedRecord;

/// Error types for record building.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The ledger does not distribute exactly 100%; no record is produced.
    #[error("ledger is incomplete: total is {total} bps, expected 10000")]
    IncompleteLedger {
        /// Actual total including the platform fee.
        total: u64,
    },

    /// Record could not be serialized for signing.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result type for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;
