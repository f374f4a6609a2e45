//! Signed-record envelope.

use serde::{Deserialize, Serialize};

use crate::ReleaseRecord;

/// A release record together with the signature produced by a signer
/// capability. The envelope is plain data; signature creation and
/// verification live with the signer, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRecord {
    /// The record the signature covers (over its canonical signing bytes).
    pub record: ReleaseRecord,
    /// Hex-encoded pubkey of the signing identity.
    pub pubkey: String,
    /// Hex-encoded signature.
    pub sig: String,
}
