//! Release drafts and their lifecycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Contributor, Split};

/// Lifecycle status of a draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// Editable; splits may be incomplete.
    Draft,
    /// A publish run completed. Logically immutable from here on; further
    /// work should start a fresh draft (not enforced at the type level).
    Published,
}

impl DraftStatus {
    /// Stable string form used in the database and over RPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Published => "published",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DraftStatus::Draft),
            "published" => Some(DraftStatus::Published),
            _ => None,
        }
    }
}

/// A release under assembly: metadata, media references, the contributor
/// roster, and the split ledger. Each draft owns its own ledger; there is
/// no shared split state between drafts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDraft {
    /// Stable identity; becomes the record's `d` tag.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub lyrics: String,
    pub genre: String,
    /// International Standard Recording Code.
    #[serde(default)]
    pub isrc: Option<String>,
    /// International Standard Musical Work Code.
    #[serde(default)]
    pub iswc: Option<String>,
    /// Phonogram copyright line.
    #[serde(default)]
    pub p_line: Option<String>,
    /// Composition copyright line.
    #[serde(default)]
    pub c_line: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Content hash of the uploaded master.
    #[serde(default)]
    pub audio_hash: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub contributors: Vec<Contributor>,
    pub splits: Vec<Split>,
    pub status: DraftStatus,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds. Volatile; never part of the published record.
    pub updated_at: u64,
}

/// Lightweight listing row for the draft library.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftSummary {
    pub id: Uuid,
    pub title: String,
    pub status: DraftStatus,
    pub updated_at: u64,
}

impl ReleaseDraft {
    /// Create an empty draft with a fresh identity.
    pub fn new(now: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            lyrics: String::new(),
            genre: String::new(),
            isrc: None,
            iswc: None,
            p_line: None,
            c_line: None,
            audio_url: None,
            audio_hash: None,
            image_url: None,
            contributors: Vec::new(),
            splits: Vec::new(),
            status: DraftStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the last-modified timestamp.
    pub fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }

    /// Add or replace a contributor, keyed by pubkey. The caller is expected
    /// to reconcile the split ledger afterwards (whole-ledger replacement).
    pub fn upsert_contributor(&mut self, contributor: Contributor, now: u64) {
        self.contributors.retain(|c| c.pubkey != contributor.pubkey);
        self.contributors.push(contributor);
        self.touch(now);
    }

    /// Remove a contributor and its split in one update, so no orphaned
    /// split entry can silently inflate the total. Returns whether a roster
    /// entry existed.
    pub fn remove_contributor(&mut self, pubkey: &str, now: u64) -> bool {
        let before = self.contributors.len();
        self.contributors.retain(|c| c.pubkey != pubkey);
        self.splits.retain(|s| s.pubkey != pubkey);
        let removed = self.contributors.len() != before;
        if removed {
            self.touch(now);
        }
        removed
    }

    /// Listing row for this draft.
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_draft_is_empty() {
        let draft = ReleaseDraft::new(1000);
        assert_eq!(draft.status, DraftStatus::Draft);
        assert!(draft.contributors.is_empty());
        assert!(draft.splits.is_empty());
        assert_eq!(draft.created_at, 1000);
        assert_eq!(draft.updated_at, 1000);
    }

    #[test]
    fn test_fresh_identities_differ() {
        assert_ne!(ReleaseDraft::new(0).id, ReleaseDraft::new(0).id);
    }

    #[test]
    fn test_upsert_contributor_replaces_by_pubkey() {
        let mut draft = ReleaseDraft::new(1000);
        draft.upsert_contributor(Contributor::new("pk1", "Nia", "Producer"), 1001);
        draft.upsert_contributor(Contributor::new("pk1", "Nia", "Main Artist"), 1002);
        assert_eq!(draft.contributors.len(), 1);
        assert_eq!(draft.contributors[0].role, "Main Artist");
        assert_eq!(draft.updated_at, 1002);
    }

    #[test]
    fn test_remove_contributor_takes_split_with_it() {
        let mut draft = ReleaseDraft::new(1000);
        draft.upsert_contributor(Contributor::new("pk1", "Nia", "Producer"), 1001);
        draft.upsert_contributor(Contributor::new("pk2", "Rey", "Vocals"), 1001);
        draft.splits.push(Split::new("pk1", 4895));
        draft.splits.push(Split::new("pk2", 4895));

        assert!(draft.remove_contributor("pk1", 1002));
        assert_eq!(draft.contributors.len(), 1);
        assert_eq!(draft.splits.len(), 1);
        assert_eq!(draft.splits[0].pubkey, "pk2");
    }

    #[test]
    fn test_remove_unknown_contributor_is_noop() {
        let mut draft = ReleaseDraft::new(1000);
        assert!(!draft.remove_contributor("ghost", 1002));
        assert_eq!(draft.updated_at, 1000);
    }

    #[test]
    fn test_status_string_roundtrip() {
        assert_eq!(DraftStatus::parse("draft"), Some(DraftStatus::Draft));
        assert_eq!(DraftStatus::parse("published"), Some(DraftStatus::Published));
        assert_eq!(DraftStatus::parse("archived"), None);
        assert_eq!(DraftStatus::Published.as_str(), "published");
    }
}
