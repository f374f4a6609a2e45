//! Draft query functions.
//!
//! The contributor roster and split ledger are stored as JSON columns and
//! written together with the rest of the row, so a draft update is atomic:
//! no reader ever sees a roster without its matching ledger.

use rusqlite::Connection;
use uuid::Uuid;

use resonate_types::{Contributor, DraftStatus, DraftSummary, ReleaseDraft, Split};

use crate::{DbError, Result};

/// Insert or replace a draft.
pub fn put(conn: &Connection, draft: &ReleaseDraft) -> Result<()> {
    let contributors = serde_json::to_string(&draft.contributors)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    let splits = serde_json::to_string(&draft.splits)
        .map_err(|e| DbError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO drafts (id, title, description, lyrics, genre, isrc, iswc,
                             p_line, c_line, audio_url, audio_hash, image_url,
                             contributors, splits, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             description = excluded.description,
             lyrics = excluded.lyrics,
             genre = excluded.genre,
             isrc = excluded.isrc,
             iswc = excluded.iswc,
             p_line = excluded.p_line,
             c_line = excluded.c_line,
             audio_url = excluded.audio_url,
             audio_hash = excluded.audio_hash,
             image_url = excluded.image_url,
             contributors = excluded.contributors,
             splits = excluded.splits,
             status = excluded.status,
             updated_at = excluded.updated_at",
        rusqlite::params![
            draft.id.to_string(),
            draft.title,
            draft.description,
            draft.lyrics,
            draft.genre,
            draft.isrc,
            draft.iswc,
            draft.p_line,
            draft.c_line,
            draft.audio_url,
            draft.audio_hash,
            draft.image_url,
            contributors,
            splits,
            draft.status.as_str(),
            draft.created_at as i64,
            draft.updated_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a draft by id.
pub fn get(conn: &Connection, id: &Uuid) -> Result<ReleaseDraft> {
    conn.query_row(
        "SELECT id, title, description, lyrics, genre, isrc, iswc, p_line, c_line,
                audio_url, audio_hash, image_url, contributors, splits, status,
                created_at, updated_at
         FROM drafts WHERE id = ?1",
        [id.to_string()],
        row_to_draft,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("draft {id}")),
        other => DbError::Sqlite(other),
    })
}

/// Delete a draft. Deleting an absent draft is not an error.
pub fn delete(conn: &Connection, id: &Uuid) -> Result<()> {
    conn.execute("DELETE FROM drafts WHERE id = ?1", [id.to_string()])?;
    Ok(())
}

/// List all drafts as summaries, most recently modified first.
pub fn list_all(conn: &Connection) -> Result<Vec<DraftSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, status, updated_at FROM drafts ORDER BY updated_at DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let status: String = row.get(2)?;
            Ok((id, row.get::<_, String>(1)?, status, row.get::<_, i64>(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, title, status, updated_at)| {
            Ok(DraftSummary {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DbError::Serialization(format!("bad draft id: {e}")))?,
                title,
                status: DraftStatus::parse(&status)
                    .ok_or_else(|| DbError::Serialization(format!("bad status '{status}'")))?,
                updated_at: updated_at as u64,
            })
        })
        .collect()
}

/// Flip a draft's status to published and bump its timestamp.
pub fn mark_published(conn: &Connection, id: &Uuid, updated_at: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE drafts SET status = 'published', updated_at = ?1 WHERE id = ?2",
        rusqlite::params![updated_at as i64, id.to_string()],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("draft {id}")));
    }
    Ok(())
}

fn row_to_draft(row: &rusqlite::Row<'_>) -> std::result::Result<ReleaseDraft, rusqlite::Error> {
    let id: String = row.get(0)?;
    let contributors_json: String = row.get(12)?;
    let splits_json: String = row.get(13)?;
    let status: String = row.get(14)?;

    let invalid = |detail: String| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            detail.into(),
        )
    };

    let contributors: Vec<Contributor> = serde_json::from_str(&contributors_json)
        .map_err(|e| invalid(format!("contributors column: {e}")))?;
    let splits: Vec<Split> =
        serde_json::from_str(&splits_json).map_err(|e| invalid(format!("splits column: {e}")))?;

    Ok(ReleaseDraft {
        id: Uuid::parse_str(&id).map_err(|e| invalid(format!("draft id: {e}")))?,
        title: row.get(1)?,
        description: row.get(2)?,
        lyrics: row.get(3)?,
        genre: row.get(4)?,
        isrc: row.get(5)?,
        iswc: row.get(6)?,
        p_line: row.get(7)?,
        c_line: row.get(8)?,
        audio_url: row.get(9)?,
        audio_hash: row.get(10)?,
        image_url: row.get(11)?,
        contributors,
        splits,
        status: DraftStatus::parse(&status)
            .ok_or_else(|| invalid(format!("status '{status}'")))?,
        created_at: row.get::<_, i64>(15)? as u64,
        updated_at: row.get::<_, i64>(16)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn draft(now: u64) -> ReleaseDraft {
        let mut draft = ReleaseDraft::new(now);
        draft.title = "Night Signal".into();
        draft.genre = "ambient".into();
        draft
            .contributors
            .push(Contributor::new("pk1", "Nia", "Main Artist"));
        draft.splits.push(Split::new("pk1", 9790));
        draft
    }

    #[test]
    fn test_put_get_roundtrip() {
        let conn = test_db();
        let draft = draft(1000);
        put(&conn, &draft).expect("put");

        let loaded = get(&conn, &draft.id).expect("get");
        assert_eq!(loaded, draft);
    }

    #[test]
    fn test_get_missing_draft() {
        let conn = test_db();
        let err = get(&conn, &Uuid::new_v4()).expect_err("missing");
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_put_is_upsert() {
        let conn = test_db();
        let mut d = draft(1000);
        put(&conn, &d).expect("insert");

        d.title = "Night Signal (final)".into();
        d.touch(2000);
        put(&conn, &d).expect("update");

        let loaded = get(&conn, &d.id).expect("get");
        assert_eq!(loaded.title, "Night Signal (final)");
        assert_eq!(loaded.updated_at, 2000);
        assert_eq!(list_all(&conn).expect("list").len(), 1);
    }

    #[test]
    fn test_list_orders_by_updated_desc() {
        let conn = test_db();
        let older = draft(1000);
        let newer = draft(5000);
        put(&conn, &older).expect("put");
        put(&conn, &newer).expect("put");

        let summaries = list_all(&conn).expect("list");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, newer.id);
        assert_eq!(summaries[1].id, older.id);
    }

    #[test]
    fn test_delete() {
        let conn = test_db();
        let d = draft(1000);
        put(&conn, &d).expect("put");
        delete(&conn, &d.id).expect("delete");
        assert!(matches!(get(&conn, &d.id), Err(DbError::NotFound(_))));
        // Deleting again is a no-op.
        delete(&conn, &d.id).expect("delete again");
    }

    #[test]
    fn test_mark_published() {
        let conn = test_db();
        let d = draft(1000);
        put(&conn, &d).expect("put");
        mark_published(&conn, &d.id, 3000).expect("mark");

        let loaded = get(&conn, &d.id).expect("get");
        assert_eq!(loaded.status, DraftStatus::Published);
        assert_eq!(loaded.updated_at, 3000);
    }

    #[test]
    fn test_mark_published_missing_draft() {
        let conn = test_db();
        let err = mark_published(&conn, &Uuid::new_v4(), 3000).expect_err("missing");
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_roster_and_ledger_stored_together() {
        let conn = test_db();
        let mut d = draft(1000);
        d.remove_contributor("pk1", 2000);
        put(&conn, &d).expect("put");

        let loaded = get(&conn, &d.id).expect("get");
        assert!(loaded.contributors.is_empty());
        assert!(loaded.splits.is_empty());
    }
}
