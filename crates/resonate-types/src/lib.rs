//! # resonate-types
//!
//! Shared domain types used across the Resonate workspace: release drafts,
//! contributors, revenue splits, and the protocol constants every other
//! crate agrees on.

pub mod contributor;
pub mod draft;
pub mod split;

pub use contributor::{Contributor, WalletHandle};
pub use draft::{DraftStatus, DraftSummary, ReleaseDraft};
pub use split::Split;

/// Platform service fee in basis points (2.1%). Never stored as a split
/// row; injected at validation and record-build time only.
pub const PLATFORM_FEE_BPS: u32 = 210;

/// A complete distribution: 10000 bps = 100%.
pub const TOTAL_BPS: u32 = 10_000;

/// Event kind for a published release record.
pub const RELEASE_KIND: u32 = 31_337;

/// Relay address assigned to new splits until the user overrides it.
pub const DEFAULT_RELAY_URL: &str = "wss://relay.resonate.fm";

/// Default platform recipient pubkey (overridable via daemon config).
pub const DEFAULT_PLATFORM_PUBKEY: &str =
    "c5b3b0f6a2e14d5890c3f7a14f2b9d147e6a0c25b19d4e83a1f08c47d9325b61";

/// The platform recipient of the synthesized fee split.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlatformRecipient {
    /// Platform pubkey the fee split pays out to.
    pub pubkey: String,
    /// Relay address carried on the synthesized fee tag.
    pub relay: String,
}

impl Default for PlatformRecipient {
    fn default() -> Self {
        Self {
            pubkey: DEFAULT_PLATFORM_PUBKEY.to_string(),
            relay: DEFAULT_RELAY_URL.to_string(),
        }
    }
}
