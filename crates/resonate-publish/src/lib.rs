//! # resonate-publish
//!
//! The publish workflow: a short linear state machine that takes a release
//! draft from validation through relay connect, record build, signing, and
//! broadcast to local persistence as published.
//!
//! The workflow owns no I/O of its own — relays, signer, and store arrive
//! as capabilities, and progress is reported through an injected observer
//! rather than any process-wide logger, so concurrent workflow instances
//! stay fully isolated.
//!
//! ## Modules
//!
//! - [`observer`] — progress reporting contract and helpers
//! - [`workflow`] — the state machine itself

pub mod observer;
pub mod workflow;

pub use observer::{EventLog, NullObserver, ProgressEvent, ProgressObserver, Severity};
pub use workflow::{DraftStore, PublishContext, PublishOutcome, Publisher};

use resonate_relay::RelayError;
use resonate_signer::SignError;

/// The stages of a publish run, in execution order. `Errored` is reachable
/// from any non-terminal stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStage {
    Idle,
    Validating,
    Connecting,
    Building,
    Signing,
    Broadcasting,
    Persisting,
    Done,
    Errored,
}

impl PublishStage {
    /// Whether the run has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishStage::Done | PublishStage::Errored)
    }

    /// Stable string form used in events and over RPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStage::Idle => "idle",
            PublishStage::Validating => "validating",
            PublishStage::Connecting => "connecting",
            PublishStage::Building => "building",
            PublishStage::Signing => "signing",
            PublishStage::Broadcasting => "broadcasting",
            PublishStage::Persisting => "persisting",
            PublishStage::Done => "done",
            PublishStage::Errored => "errored",
        }
    }
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for publish runs. Each maps to the stage it halts.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Splits (plus platform fee) do not total exactly 10000 bps. Raised
    /// before any external collaborator is touched.
    #[error("split total is {total} bps, must be exactly 10000")]
    SplitMismatch {
        /// Actual total including the platform fee.
        total: u64,
    },

    /// A publish run is already in flight for this draft.
    #[error("a publish run is already in flight for this draft")]
    AlreadyInFlight,

    /// No relay connection could be established.
    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),

    /// The builder refused the ledger after validation had passed. Not
    /// reachable through this workflow's own sequencing; treated as a fatal
    /// invariant violation.
    #[error("ledger incomplete at build time: {total} bps")]
    IncompleteLedger {
        /// Actual total including the platform fee.
        total: u64,
    },

    /// The signer (or the human behind it) refused.
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    /// No signing decision within the allowed window.
    #[error("signing timed out after {secs}s")]
    SigningTimeout { secs: u64 },

    /// Every relay refused the record.
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// No relay acknowledged within the bounded window.
    #[error("broadcast timed out after {secs}s")]
    BroadcastTimeout { secs: u64 },

    /// The caller cancelled at a suspension point.
    #[error("publish cancelled")]
    Cancelled,

    /// Marking the draft published failed.
    #[error("persistence failed: {0}")]
    Storage(String),
}

impl From<SignError> for PublishError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Rejected(detail) => PublishError::SigningRejected(detail),
            SignError::Timeout { secs } => PublishError::SigningTimeout { secs },
            SignError::Cancelled => PublishError::Cancelled,
            SignError::InvalidInput(detail) => PublishError::SigningRejected(detail),
        }
    }
}

impl From<RelayError> for PublishError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Unavailable(detail) => PublishError::RelayUnavailable(detail),
            RelayError::BroadcastRejected(detail) => PublishError::BroadcastRejected(detail),
            RelayError::BroadcastTimeout { secs } => PublishError::BroadcastTimeout { secs },
        }
    }
}

/// Convenience result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;
