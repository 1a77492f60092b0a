//! Local Cache - SQLite-backed key-value store with a byte quota
//!
//! Holds the offline copy of the data set while nobody is signed in.
//! Values are JSON strings; the quota counts the bytes of all stored values.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Cache database file name inside the data directory
pub const CACHE_FILE: &str = "cache.db";

/// Default quota (5 MB)
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Quota exceeded: {requested} bytes requested, {used} of {quota} bytes in use")]
    QuotaExceeded {
        requested: usize,
        used: usize,
        quota: usize,
    },
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Sqlite(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Keys the app stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Workouts,
    WorkoutTemplates,
    FavoriteExercises,
    UnitSettings,
    HasMigrated,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Workouts => "workouts",
            CacheKey::WorkoutTemplates => "workoutTemplates",
            CacheKey::FavoriteExercises => "favoriteExercises",
            CacheKey::UnitSettings => "unitSettings",
            CacheKey::HasMigrated => "hasMigrated",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LocalCache {
    conn: Mutex<Connection>,
    quota_bytes: usize,
    path: Option<PathBuf>,
}

impl LocalCache {
    /// Create or open the cache in `data_dir`
    pub fn open(data_dir: &Path, quota_bytes: usize) -> CacheResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CACHE_FILE);

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let cache = Self::init(conn, quota_bytes, Some(path))?;
        tracing::info!(path = ?cache.path, quota_bytes, "Opened local cache");
        Ok(cache)
    }

    /// A throwaway cache, for tests and `--no-cache` runs
    pub fn in_memory(quota_bytes: usize) -> CacheResult<Self> {
        Self::init(Connection::open_in_memory()?, quota_bytes, None)
    }

    fn init(conn: Connection, quota_bytes: usize, path: Option<PathBuf>) -> CacheResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            quota_bytes,
            path,
        })
    }

    fn conn(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Sqlite("cache connection lock poisoned".to_string()))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    pub fn get_raw(&self, key: CacheKey) -> CacheResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get<T: DeserializeOwned>(&self, key: CacheKey) -> CacheResult<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store a value, failing with `QuotaExceeded` if it does not fit
    pub fn set<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        let conn = self.conn()?;

        let used: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv WHERE key != ?",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        let used = used.max(0) as usize;
        if used + raw.len() > self.quota_bytes {
            return Err(CacheError::QuotaExceeded {
                requested: raw.len(),
                used,
                quota: self.quota_bytes,
            });
        }

        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![key.as_str(), raw],
        )?;
        Ok(())
    }

    /// Store a value; on quota failure wipe the whole cache and try once more
    pub fn save_with_fallback<T: Serialize + ?Sized>(
        &self,
        key: CacheKey,
        value: &T,
    ) -> CacheResult<()> {
        match self.set(key, value) {
            Err(CacheError::QuotaExceeded {
                requested, used, ..
            }) => {
                tracing::warn!(
                    key = %key,
                    requested,
                    used,
                    quota = self.quota_bytes,
                    "Local cache quota exceeded, clearing cache and retrying"
                );
                self.clear()?;
                self.set(key, value)
            }
            other => other,
        }
    }

    pub fn remove(&self, key: CacheKey) -> CacheResult<()> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?", params![key.as_str()])?;
        Ok(())
    }

    /// Remove every key, including the migration marker
    pub fn clear(&self) -> CacheResult<()> {
        self.conn()?.execute("DELETE FROM kv", [])?;
        Ok(())
    }

    /// Bytes of all stored values
    pub fn usage_bytes(&self) -> CacheResult<usize> {
        let used: i64 = self.conn()?.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as usize)
    }

    /// Whether the cache has already been copied into the remote store
    pub fn has_migrated(&self) -> CacheResult<bool> {
        Ok(self.get::<bool>(CacheKey::HasMigrated)?.unwrap_or(false))
    }

    pub fn mark_migrated(&self) -> CacheResult<()> {
        self.save_with_fallback(CacheKey::HasMigrated, &true)
    }
}
