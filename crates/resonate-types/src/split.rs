//! Revenue split entries.

use serde::{Deserialize, Serialize};

/// A single recipient's payout share of a release's future revenue.
///
/// `weight` is in basis points (1/100 of a percent), so `5790` means 57.9%.
/// The unsigned type makes negative weights unrepresentable at rest; the
/// ledger operations additionally reject negative input arriving over the
/// RPC boundary before it is ever narrowed to this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Recipient pubkey. Opaque unique identifier as far as the ledger is
    /// concerned; format validity is the identity layer's problem.
    pub pubkey: String,
    /// Relay address where the recipient prefers to be paid/notified.
    pub relay: String,
    /// Share in basis points.
    pub weight: u32,
}

impl Split {
    /// Create a split with the given weight and the workspace default relay.
    pub fn new(pubkey: impl Into<String>, weight: u32) -> Self {
        Self {
            pubkey: pubkey.into(),
            relay: crate::DEFAULT_RELAY_URL.to_string(),
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_relay() {
        let split = Split::new("abc", 9790);
        assert_eq!(split.relay, crate::DEFAULT_RELAY_URL);
        assert_eq!(split.weight, 9790);
    }

    #[test]
    fn test_serde_roundtrip() {
        let split = Split::new("abc", 4895);
        let json = serde_json::to_string(&split).expect("serialize");
        let back: Split = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(split, back);
    }
}
