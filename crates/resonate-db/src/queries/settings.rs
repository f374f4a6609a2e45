//! Settings query functions.

use rusqlite::Connection;

use crate::{DbError, Result};

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("setting '{key}'")),
        other => DbError::Sqlite(other),
    })
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Get a setting, defaulting if not found.
pub fn get_or(conn: &Connection, key: &str, default: &str) -> Result<String> {
    match get(conn, key) {
        Ok(v) => Ok(v),
        Err(DbError::NotFound(_)) => Ok(default.to_string()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let conn = crate::open_memory().expect("open");
        set(&conn, "default_relay", "wss://relay.other.example").expect("set");
        assert_eq!(
            get(&conn, "default_relay").expect("get"),
            "wss://relay.other.example"
        );
    }

    #[test]
    fn test_get_or_default() {
        let conn = crate::open_memory().expect("open");
        assert_eq!(
            get_or(&conn, "no_such_key", "fallback").expect("get_or"),
            "fallback"
        );
    }
}
