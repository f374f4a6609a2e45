//! # resonate-signer
//!
//! The signer capability: one `sign` contract, two implementations.
//!
//! - [`LocalSigner`] holds an Ed25519 key in-process and signs immediately.
//! - [`RemoteSigner`] forwards the record to an external approver device and
//!   waits — possibly tens of seconds — for a human decision, with a bounded
//!   timeout and a cancellable wait.
//!
//! Which one a publish run uses is decided explicitly from the contributor
//! roster ([`select_kind`]), never by probing object shapes at runtime.
//!
//! ## Modules
//!
//! - [`local`] — in-process Ed25519 signer
//! - [`remote`] — delegated device signer

pub mod local;
pub mod remote;

pub use local::{verify, LocalSigner};
pub use remote::{
    RemoteCancelHandle, RemoteSessionHandle, RemoteSigner, SignRequest, DEFAULT_APPROVAL_TIMEOUT,
};

use resonate_record::{ReleaseRecord, SignedRecord};
use resonate_types::Contributor;

/// Error types for signing operations.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The signer (or the human behind it) refused to sign.
    #[error("signing rejected: {0}")]
    Rejected(String),

    /// No decision arrived within the allowed window.
    #[error("signing timed out after {secs}s")]
    Timeout {
        /// The window that elapsed.
        secs: u64,
    },

    /// The caller cancelled the wait.
    #[error("signing cancelled")]
    Cancelled,

    /// The record could not be serialized into signing bytes, or a
    /// signature failed verification.
    #[error("invalid signing input: {0}")]
    InvalidInput(String),
}

/// Convenience result type for signing operations.
pub type Result<T> = std::result::Result<T, SignError>;

/// The polymorphic signing capability.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// Sign a release record, producing the broadcastable envelope.
    async fn sign(&self, record: ReleaseRecord) -> Result<SignedRecord>;
}

/// Which signer variant a publish run should use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerKind {
    /// Sign in-process with the locally held key.
    Local,
    /// Delegate to the lead contributor's external device.
    Remote,
}

/// Pick the signer variant for a roster: the lead contributor is the first
/// one flagged for remote signing, falling back to the main artist; remote
/// signing is used only when that lead actually carries the flag.
pub fn select_kind(contributors: &[Contributor]) -> SignerKind {
    let lead = contributors
        .iter()
        .find(|c| c.remote_signer || c.role == "Main Artist");
    match lead {
        Some(c) if c.remote_signer => SignerKind::Remote,
        _ => SignerKind::Local,
    }
}
