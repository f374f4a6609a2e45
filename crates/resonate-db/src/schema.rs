//! SQL schema definitions.

/// Complete schema for the Resonate v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Release drafts
-- ============================================================

CREATE TABLE IF NOT EXISTS drafts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    lyrics TEXT NOT NULL,
    genre TEXT NOT NULL,
    isrc TEXT,
    iswc TEXT,
    p_line TEXT,
    c_line TEXT,
    audio_url TEXT,
    audio_hash TEXT,
    image_url TEXT,
    contributors TEXT NOT NULL DEFAULT '[]',
    splits TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'draft',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_drafts_updated ON drafts(updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts(status);

-- ============================================================
-- Artist roster (provisioned and external identities)
-- ============================================================

CREATE TABLE IF NOT EXISTS artists (
    pubkey TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    image TEXT,
    is_ghost INTEGER NOT NULL DEFAULT 0,
    remote_signer INTEGER NOT NULL DEFAULT 0,
    wallet TEXT,
    added_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
