//! Key-value preference storage.
//!
//! # Responsibility
//! - Provide string-keyed, string-valued persistence for the metadata
//!   document and for inline blobs.
//!
//! # Invariants
//! - `set` overwrites any prior value atomically per key.
//! - `remove` on a missing key succeeds and reports `false`.

use super::{RepoError, RepoResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Removes `key`, returning whether a value existed.
    fn remove(&self, key: &str) -> RepoResult<bool>;
    /// Returns keys starting with `prefix`, sorted ascending.
    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        (**self).remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }
}

/// SQLite-backed key-value store over the `kv_entries` table.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) the preferences database at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::LockPoisoned("kv connection"))?;
        f(&conn)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1;",
                    [key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
            Ok(changed > 0)
        })
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM kv_entries
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key ASC;",
            )?;
            let keys = stmt
                .query_map([prefix], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }
}

/// Process-local key-value store.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> RepoResult<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RepoError::LockPoisoned("memory kv"))?;
        Ok(f(&mut entries))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        self.with_entries(|entries| entries.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        self.with_entries(|entries| {
            entries
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("photo:a", "1").unwrap();
        store.set("photo:b", "2").unwrap();
        store.set("photos", "[]").unwrap();
        store.set("photo:a", "3").unwrap();

        assert_eq!(store.get("photo:a").unwrap().as_deref(), Some("3"));
        assert_eq!(
            store.keys_with_prefix("photo:").unwrap(),
            vec!["photo:a".to_string(), "photo:b".to_string()]
        );

        assert!(store.remove("photo:a").unwrap());
        assert!(!store.remove("photo:a").unwrap());
        assert_eq!(store.get("photo:a").unwrap(), None);
    }

    #[test]
    fn sqlite_store_supports_basic_operations() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        exercise(&store);
    }

    #[test]
    fn memory_store_supports_basic_operations() {
        exercise(&MemoryKeyValueStore::new());
    }

    #[test]
    fn sqlite_prefix_match_treats_wildcards_literally() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        store.set("photo_1", "x").unwrap();
        store.set("photoX1", "y").unwrap();
        assert_eq!(
            store.keys_with_prefix("photo_").unwrap(),
            vec!["photo_1".to_string()]
        );
    }
}
