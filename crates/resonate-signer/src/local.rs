//! In-process Ed25519 signer.
//!
//! Wraps `ed25519-dalek` behind the [`Signer`](crate::Signer) contract.
//! `SigningKey` zeroizes its own material on drop.

use ed25519_dalek::{Signer as DalekSigner, Verifier};

use resonate_record::{ReleaseRecord, SignedRecord};

use crate::{Result, SignError, Signer};

/// A signer holding an Ed25519 key in-process. Signing is immediate; this
/// is the fast path for artists whose key the studio holds.
pub struct LocalSigner {
    key: ed25519_dalek::SigningKey,
}

impl LocalSigner {
    /// Generate a signer with a fresh random key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build a signer from raw secret key bytes.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(secret),
        }
    }

    /// Build a signer from a hex-encoded secret key.
    pub fn from_hex(secret: &str) -> Result<Self> {
        let bytes = hex::decode(secret)
            .map_err(|e| SignError::InvalidInput(format!("bad secret hex: {e}")))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignError::InvalidInput("secret key must be 32 bytes".to_string()))?;
        Ok(Self::from_bytes(&secret))
    }

    /// Hex-encoded public key of this signer.
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Raw secret key bytes. Needed by provisioning to hand a ghost identity
    /// its claim secret; callers are responsible for not persisting this
    /// anywhere it should not live.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

#[async_trait::async_trait]
impl Signer for LocalSigner {
    async fn sign(&self, record: ReleaseRecord) -> Result<SignedRecord> {
        let bytes = record
            .signing_bytes()
            .map_err(|e| SignError::InvalidInput(e.to_string()))?;
        let sig = self.key.sign(&bytes);

        tracing::debug!(pubkey = %self.pubkey_hex(), "record signed locally");

        Ok(SignedRecord {
            record,
            pubkey: self.pubkey_hex(),
            sig: hex::encode(sig.to_bytes()),
        })
    }
}

/// Verify a signed record's signature against its embedded pubkey.
///
/// # Errors
///
/// - [`SignError::InvalidInput`] if the pubkey, signature, or signing bytes
///   are malformed or the signature does not verify
pub fn verify(signed: &SignedRecord) -> Result<()> {
    let pubkey_bytes: [u8; 32] = hex::decode(&signed.pubkey)
        .map_err(|e| SignError::InvalidInput(format!("bad pubkey hex: {e}")))?
        .try_into()
        .map_err(|_| SignError::InvalidInput("pubkey must be 32 bytes".to_string()))?;
    let sig_bytes: [u8; 64] = hex::decode(&signed.sig)
        .map_err(|e| SignError::InvalidInput(format!("bad signature hex: {e}")))?
        .try_into()
        .map_err(|_| SignError::InvalidInput("signature must be 64 bytes".to_string()))?;

    let key = ed25519_dalek::VerifyingKey::from_bytes(&pubkey_bytes)
        .map_err(|e| SignError::InvalidInput(e.to_string()))?;
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    let bytes = signed
        .record
        .signing_bytes()
        .map_err(|e| SignError::InvalidInput(e.to_string()))?;

    key.verify(&bytes, &sig)
        .map_err(|_| SignError::InvalidInput("signature verification failed".to_string()))
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("pubkey", &self.pubkey_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ReleaseRecord {
        ReleaseRecord {
            kind: resonate_types::RELEASE_KIND,
            created_at: 1_700_000_000,
            tags: vec![vec!["d".into(), "some-id".into()]],
            content: "{}".into(),
        }
    }

    #[tokio::test]
    async fn test_sign_verify_roundtrip() {
        let signer = LocalSigner::generate();
        let signed = signer.sign(record()).await.expect("sign");
        assert_eq!(signed.pubkey, signer.pubkey_hex());
        verify(&signed).expect("verify");
    }

    #[tokio::test]
    async fn test_tampered_record_fails_verification() {
        let signer = LocalSigner::generate();
        let mut signed = signer.sign(record()).await.expect("sign");
        signed.record.content = r#"{"description":"tampered"}"#.into();
        assert!(verify(&signed).is_err());
    }

    #[tokio::test]
    async fn test_wrong_key_fails_verification() {
        let signer = LocalSigner::generate();
        let other = LocalSigner::generate();
        let mut signed = signer.sign(record()).await.expect("sign");
        signed.pubkey = other.pubkey_hex();
        assert!(verify(&signed).is_err());
    }

    #[test]
    fn test_from_bytes_is_deterministic() {
        let a = LocalSigner::from_bytes(&[7u8; 32]);
        let b = LocalSigner::from_bytes(&[7u8; 32]);
        assert_eq!(a.pubkey_hex(), b.pubkey_hex());
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(LocalSigner::from_hex("not hex").is_err());
        assert!(LocalSigner::from_hex("abcd").is_err());
    }
}
