//! # resonate-provision
//!
//! Identity provisioning: mints a custodial wallet at the custody provider
//! and a platform-held ("ghost") Ed25519 identity for artists who have no
//! key of their own yet. The custody provider's wire protocol stays inside
//! this crate; callers get back an opaque identity + wallet handle.
//!
//! The call is all-or-nothing. The wallet is minted first, and only after
//! the provider answers is a keypair generated and the complete identity
//! returned — a provider failure leaves nothing half-created for the caller
//! to clean up.

use serde::{Deserialize, Serialize};

use resonate_types::WalletHandle;

/// Error types for provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Transport-level failure talking to the custody provider.
    #[error("custody provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("custody provider refused ({status}): {detail}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Provider-supplied error body, if any.
        detail: String,
    },

    /// The provider answered 2xx but the body was not usable.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Convenience result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// A freshly minted identity plus its custodial wallet.
///
/// `secret` is the claim secret for the ghost identity. It is returned
/// exactly once; persisting it anywhere beyond the contributor record is
/// the caller's liability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisionedIdentity {
    /// Hex-encoded Ed25519 public key.
    pub pubkey: String,
    /// Hex-encoded Ed25519 secret key (the claim secret).
    pub secret: String,
    /// Custodial wallet handle at the provider.
    pub wallet: WalletHandle,
}

/// Client for the custody provider's user-management API.
pub struct ProvisioningClient {
    http: reqwest::Client,
    base_url: String,
    admin_key: String,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    user_name: &'a str,
    wallet_name: &'a str,
}

#[derive(Deserialize)]
struct CreateUserResponse {
    wallets: Vec<ProviderWallet>,
}

#[derive(Deserialize)]
struct ProviderWallet {
    id: String,
    #[serde(rename = "inkey")]
    invoice_key: String,
    #[serde(rename = "adminkey")]
    admin_key: String,
}

impl ProvisioningClient {
    /// Create a client for the provider at `base_url`, authenticating with
    /// the platform admin key.
    pub fn new(base_url: impl Into<String>, admin_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_key: admin_key.into(),
        }
    }

    /// Mint a wallet and a ghost identity for `display_name`.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::Http`] / [`ProvisionError::Provider`] /
    ///   [`ProvisionError::MalformedResponse`] if the wallet cannot be
    ///   minted; no identity is created in that case
    pub async fn create_identity(&self, display_name: &str) -> Result<ProvisionedIdentity> {
        let wallet = self.create_wallet(display_name).await?;

        // Wallet exists; minting the keypair is local and infallible, so the
        // identity can no longer end up half-created.
        let mut csprng = rand::rngs::OsRng;
        let key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let pubkey = hex::encode(key.verifying_key().to_bytes());
        let secret = hex::encode(key.to_bytes());

        tracing::info!(%display_name, %pubkey, wallet = %wallet.id, "ghost identity provisioned");

        Ok(ProvisionedIdentity {
            pubkey,
            secret,
            wallet,
        })
    }

    async fn create_wallet(&self, display_name: &str) -> Result<WalletHandle> {
        let url = format!("{}/usermanager/api/v1/users", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.admin_key)
            .json(&CreateUserRequest {
                user_name: display_name,
                wallet_name: "ResonateWallet",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "custody provider refused wallet creation");
            return Err(ProvisionError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let body: CreateUserResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::MalformedResponse(e.to_string()))?;
        let wallet = body
            .wallets
            .into_iter()
            .next()
            .ok_or_else(|| ProvisionError::MalformedResponse("no wallet in response".into()))?;

        Ok(wallet.into_handle(&self.base_url))
    }
}

impl ProviderWallet {
    fn into_handle(self, base_url: &str) -> WalletHandle {
        let payment_url = format!("{base_url}/lnurlp/api/v1/lnurl/{}", self.invoice_key);
        WalletHandle {
            id: self.id,
            invoice_key: Some(self.invoice_key),
            admin_key: Some(self.admin_key),
            payment_url: Some(payment_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_response_parsing() {
        let body = r#"{
            "id": "u1",
            "wallets": [
                {"id": "w1", "inkey": "ik-123", "adminkey": "ak-456", "name": "ResonateWallet"}
            ]
        }"#;
        let parsed: CreateUserResponse = serde_json::from_str(body).expect("parse");
        let wallet = parsed
            .wallets
            .into_iter()
            .next()
            .expect("wallet")
            .into_handle("https://custody.example");

        assert_eq!(wallet.id, "w1");
        assert_eq!(wallet.invoice_key.as_deref(), Some("ik-123"));
        assert_eq!(wallet.admin_key.as_deref(), Some("ak-456"));
        assert_eq!(
            wallet.payment_url.as_deref(),
            Some("https://custody.example/lnurlp/api/v1/lnurl/ik-123")
        );
    }

    #[test]
    fn test_empty_wallet_list_is_malformed() {
        let parsed: CreateUserResponse =
            serde_json::from_str(r#"{"wallets": []}"#).expect("parse");
        assert!(parsed.wallets.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ProvisioningClient::new("https://custody.example/", "admin");
        assert_eq!(client.base_url, "https://custody.example");
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(CreateUserRequest {
            user_name: "Session Drummer",
            wallet_name: "ResonateWallet",
        })
        .expect("serialize");
        assert_eq!(body["user_name"], "Session Drummer");
        assert_eq!(body["wallet_name"], "ResonateWallet");
    }
}
