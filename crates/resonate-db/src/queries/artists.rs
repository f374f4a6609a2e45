//! Artist roster query functions.
//!
//! The roster stores every identity the studio knows about — externally
//! owned artists and platform-provisioned ghosts — independently of any
//! draft, so contributors can be reused across releases.

use rusqlite::Connection;

use resonate_types::{Contributor, WalletHandle};

use crate::{DbError, Result};

/// Insert or replace a roster entry, keyed by pubkey.
pub fn upsert(conn: &Connection, contributor: &Contributor, added_at: u64) -> Result<()> {
    let wallet = contributor
        .wallet
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO artists (pubkey, name, role, image, is_ghost, remote_signer, wallet, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(pubkey) DO UPDATE SET
             name = excluded.name,
             role = excluded.role,
             image = excluded.image,
             is_ghost = excluded.is_ghost,
             remote_signer = excluded.remote_signer,
             wallet = excluded.wallet",
        rusqlite::params![
            contributor.pubkey,
            contributor.name,
            contributor.role,
            contributor.image,
            contributor.is_ghost,
            contributor.remote_signer,
            wallet,
            added_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a roster entry by pubkey.
pub fn get(conn: &Connection, pubkey: &str) -> Result<Contributor> {
    conn.query_row(
        "SELECT pubkey, name, role, image, is_ghost, remote_signer, wallet
         FROM artists WHERE pubkey = ?1",
        [pubkey],
        row_to_contributor,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("artist {pubkey}")),
        other => DbError::Sqlite(other),
    })
}

/// List the whole roster ordered by name.
pub fn list(conn: &Connection) -> Result<Vec<Contributor>> {
    let mut stmt = conn.prepare(
        "SELECT pubkey, name, role, image, is_ghost, remote_signer, wallet
         FROM artists ORDER BY name",
    )?;

    let rows = stmt
        .query_map([], row_to_contributor)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Remove a roster entry.
pub fn remove(conn: &Connection, pubkey: &str) -> Result<()> {
    let removed = conn.execute("DELETE FROM artists WHERE pubkey = ?1", [pubkey])?;
    if removed == 0 {
        return Err(DbError::NotFound(format!("artist {pubkey}")));
    }
    Ok(())
}

fn row_to_contributor(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<Contributor, rusqlite::Error> {
    let wallet_json: Option<String> = row.get(6)?;
    let wallet: Option<WalletHandle> = wallet_json
        .map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    format!("wallet column: {e}").into(),
                )
            })
        })
        .transpose()?;

    Ok(Contributor {
        pubkey: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        image: row.get(3)?,
        is_ghost: row.get(4)?,
        remote_signer: row.get(5)?,
        wallet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn ghost() -> Contributor {
        let mut c = Contributor::new("pk-ghost", "Session Drummer", "Drums");
        c.is_ghost = true;
        c.wallet = Some(WalletHandle {
            id: "w1".into(),
            invoice_key: Some("ik".into()),
            admin_key: Some("ak".into()),
            payment_url: Some("https://pay.example/w1".into()),
        });
        c
    }

    #[test]
    fn test_upsert_get_roundtrip() {
        let conn = test_db();
        let c = ghost();
        upsert(&conn, &c, 1000).expect("upsert");
        assert_eq!(get(&conn, "pk-ghost").expect("get"), c);
    }

    #[test]
    fn test_upsert_replaces() {
        let conn = test_db();
        let mut c = ghost();
        upsert(&conn, &c, 1000).expect("insert");
        c.role = "Percussion".into();
        upsert(&conn, &c, 2000).expect("update");

        let loaded = get(&conn, "pk-ghost").expect("get");
        assert_eq!(loaded.role, "Percussion");
        assert_eq!(list(&conn).expect("list").len(), 1);
    }

    #[test]
    fn test_list_ordered_by_name() {
        let conn = test_db();
        upsert(&conn, &Contributor::new("pk2", "Zara", "Vocals"), 1000).expect("upsert");
        upsert(&conn, &Contributor::new("pk1", "Ade", "Producer"), 1000).expect("upsert");

        let roster = list(&conn).expect("list");
        assert_eq!(roster[0].name, "Ade");
        assert_eq!(roster[1].name, "Zara");
    }

    #[test]
    fn test_remove() {
        let conn = test_db();
        upsert(&conn, &ghost(), 1000).expect("upsert");
        remove(&conn, "pk-ghost").expect("remove");
        assert!(matches!(get(&conn, "pk-ghost"), Err(DbError::NotFound(_))));
        assert!(matches!(remove(&conn, "pk-ghost"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_wallet_column_optional() {
        let conn = test_db();
        upsert(&conn, &Contributor::new("pk1", "Ade", "Producer"), 1000).expect("upsert");
        assert!(get(&conn, "pk1").expect("get").wallet.is_none());
    }
}
