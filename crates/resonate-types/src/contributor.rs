//! Contributor roster entries.

use serde::{Deserialize, Serialize};

/// A contributor to a release: anyone credited on the record and therefore
/// entitled to a split while they remain on the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Recipient pubkey. Relates 1:1 to a `Split` while both exist.
    pub pubkey: String,
    /// Display name.
    pub name: String,
    /// Free-text role ("Main Artist", "Producer", ...). Normalized to a
    /// lower_snake token only at record-build time.
    pub role: String,
    /// Optional avatar/press image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Platform-provisioned identity pending claim by the real person.
    #[serde(default)]
    pub is_ghost: bool,
    /// Key lives on an external device; publishing must go through the
    /// delegated signer rather than the local one.
    #[serde(default)]
    pub remote_signer: bool,
    /// Custodial wallet minted at provisioning time, if any.
    #[serde(default)]
    pub wallet: Option<WalletHandle>,
}

/// Handle to a custodial wallet at the custody provider. Opaque to the
/// publishing core; only the provisioning client knows the wire protocol
/// behind it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletHandle {
    /// Provider-side wallet id.
    pub id: String,
    /// Read-only key for invoice creation.
    #[serde(default)]
    pub invoice_key: Option<String>,
    /// Full-control key. Held only for ghost identities until claimed.
    #[serde(default)]
    pub admin_key: Option<String>,
    /// Static payment URL for the wallet.
    #[serde(default)]
    pub payment_url: Option<String>,
}

impl Contributor {
    /// Create a plain (externally-owned) contributor.
    pub fn new(pubkey: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            name: name.into(),
            role: role.into(),
            image: None,
            is_ghost: false,
            remote_signer: false,
            wallet: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Contributor::new("pk", "Nia", "Producer");
        assert!(!c.is_ghost);
        assert!(!c.remote_signer);
        assert!(c.wallet.is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        // Older rows lack the optional fields entirely.
        let c: Contributor = serde_json::from_str(
            r#"{"pubkey":"pk","name":"Nia","role":"Producer"}"#,
        )
        .expect("deserialize");
        assert!(!c.is_ghost);
        assert!(c.image.is_none());
    }
}
