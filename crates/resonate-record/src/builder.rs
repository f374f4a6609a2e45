//! Release record assembly.
//!
//! Downstream consumers index on a fixed tag shape, so every descriptive tag
//! is always present with an empty string standing in for unset optionals —
//! never a missing tag. Tag order is stable: descriptive tags, then one `p`
//! tag per contributor, then one `zap` tag per split, then exactly one
//! synthesized platform `zap` tag.

use serde::{Deserialize, Serialize};

use resonate_types::{PlatformRecipient, ReleaseDraft, PLATFORM_FEE_BPS, RELEASE_KIND};

use crate::{RecordError, Result};

/// Media-type marker carried on the audio `url` tag.
const AUDIO_MEDIA_TYPE: &str = "audio/mpeg";

/// The immutable broadcastable artifact built from a validated draft.
///
/// Deterministic: identical inputs produce an identical record. The draft's
/// `updated_at` is deliberately absent; `created_at` is supplied by the
/// caller so the builder stays a pure function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Event kind ([`RELEASE_KIND`]).
    pub kind: u32,
    /// Unix seconds, supplied by the caller.
    pub created_at: u64,
    /// Ordered tag list; see module docs for the shape.
    pub tags: Vec<Vec<String>>,
    /// JSON blob carrying the free-text fields (description, lyrics).
    pub content: String,
}

impl ReleaseRecord {
    /// Canonical byte serialization used as the signing input.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The draft identity this record was built from (`d` tag), if present.
    pub fn identifier(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some("d"))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

/// Build a release record from a draft and its validated split ledger.
///
/// Must be called only after the ledger passes completeness validation; the
/// check is repeated here because building from an invalid ledger would put
/// a wrong distribution on the wire, and that is cheaper to refuse than to
/// chase afterwards.
///
/// # Errors
///
/// - [`RecordError::IncompleteLedger`] if the splits (plus platform fee) do
///   not total exactly 10000 bps
pub fn build(
    draft: &ReleaseDraft,
    platform: &PlatformRecipient,
    created_at: u64,
) -> Result<ReleaseRecord> {
    let total = resonate_ledger::total_bps(&draft.splits);
    if !resonate_ledger::is_complete(&draft.splits) {
        return Err(RecordError::IncompleteLedger { total });
    }

    let opt = |field: &Option<String>| field.clone().unwrap_or_default();

    let mut tags: Vec<Vec<String>> = vec![
        vec!["d".into(), draft.id.to_string()],
        vec!["title".into(), draft.title.clone()],
        vec!["t".into(), draft.genre.clone()],
        vec!["isrc".into(), opt(&draft.isrc)],
        vec!["iswc".into(), opt(&draft.iswc)],
        vec![
            "url".into(),
            opt(&draft.audio_url),
            AUDIO_MEDIA_TYPE.into(),
        ],
        vec!["image".into(), opt(&draft.image_url)],
        vec!["p-line".into(), opt(&draft.p_line)],
        vec!["c-line".into(), opt(&draft.c_line)],
    ];

    for contributor in &draft.contributors {
        tags.push(vec![
            "p".into(),
            contributor.pubkey.clone(),
            normalize_role(&contributor.role),
        ]);
    }

    for split in &draft.splits {
        tags.push(vec![
            "zap".into(),
            split.pubkey.clone(),
            split.relay.clone(),
            split.weight.to_string(),
        ]);
    }
    tags.push(vec![
        "zap".into(),
        platform.pubkey.clone(),
        platform.relay.clone(),
        PLATFORM_FEE_BPS.to_string(),
    ]);

    let content = serde_json::to_string(&serde_json::json!({
        "description": draft.description,
        "lyrics": draft.lyrics,
    }))?;

    tracing::debug!(
        draft_id = %draft.id,
        tags = tags.len(),
        "release record built"
    );

    Ok(ReleaseRecord {
        kind: RELEASE_KIND,
        created_at,
        tags,
        content,
    })
}

/// Normalize a free-text role into a stable token: lower-cased, spaces
/// replaced with underscores.
fn normalize_role(role: &str) -> String {
    role.to_lowercase().replace(' ', "_")
}
