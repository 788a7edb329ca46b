//! Preferences schema history.
//!
//! The preferences database holds one table, `kv_entries`, mapping string keys
//! (`photos`, `photo:<id>`) to string values. Each step below is applied at
//! most once; the highest applied step is stored in `PRAGMA user_version`.
//! A database stamped with a step this binary does not know is refused rather
//! than rewritten.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(user_version, sql)` pairs in ascending order.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_kv_entries.sql"))];

/// Highest schema step this binary can open.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to [`latest_version`] inside one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stamped: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if stamped > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stamped,
            latest_supported: latest,
        });
    }

    let pending: Vec<&(u32, &str)> = SCHEMA_STEPS
        .iter()
        .filter(|(version, _)| *version > stamped)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in &pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        stamped, latest
    );
    Ok(())
}
