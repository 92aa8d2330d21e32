//! LibSQL storage backend implementation
//!
//! Persists the key-value contract in two tables: `kv` for plain values (with
//! an optional expiry in unix milliseconds) and `kv_sets` for set members.
//! Each trait method is a single SQL statement, so per-key atomicity comes
//! from SQLite itself.

use crate::config::{StorageConfig, StoreKind};
use crate::error::{DaytrackError, Result};
use crate::storage::KvStore;
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite caps bound variables per statement; batch reads are chunked below it
const BATCH_CHUNK: usize = 500;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    expires_at INTEGER
);

CREATE TABLE IF NOT EXISTS kv_sets (
    key TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (key, member)
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', '1');

CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
    /// Remote database (Turso Cloud)
    Remote { url: String, token: String },
}

impl ConnectionMode {
    /// Pick a mode from configuration; `default_path` is used when no path is set
    pub fn from_config(config: &StorageConfig, default_path: &str) -> Result<Self> {
        if config.backend == StoreKind::Memory {
            return Err(DaytrackError::InvalidOperation(
                "memory backend has no libsql connection mode".to_string(),
            ));
        }

        match (&config.url, &config.token) {
            (Some(url), Some(token)) => Ok(ConnectionMode::Remote {
                url: url.clone(),
                token: token.clone(),
            }),
            (Some(_), None) => Err(DaytrackError::Database(
                "Remote database URL configured without a token".to_string(),
            )),
            _ => {
                let path = config.path.clone().unwrap_or_else(|| default_path.to_string());
                if path == ":memory:" {
                    Ok(ConnectionMode::InMemory)
                } else {
                    Ok(ConnectionMode::Local(path))
                }
            }
        }
    }
}

/// LibSQL-backed key-value store
pub struct LibsqlStore {
    // Kept alive for the lifetime of `conn`
    _db: Database,
    conn: Connection,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_millis() + ttl.as_millis() as i64)
}

impl LibsqlStore {
    /// Validate database file before opening
    ///
    /// Returns `Ok(false)` if the file doesn't exist yet, `Ok(true)` if it
    /// exists and carries an SQLite header.
    fn validate_database_file(db_path: &str) -> Result<bool> {
        use std::fs;
        use std::path::Path;

        let path = Path::new(db_path);
        if !path.exists() {
            return Ok(false);
        }

        let bytes = fs::read(path).map_err(|e| {
            DaytrackError::Database(format!("Cannot read database file at '{}': {}", db_path, e))
        })?;

        // Freshly created files are empty until the first write
        if bytes.is_empty() {
            return Ok(true);
        }

        if bytes.len() < 16 || &bytes[0..16] != b"SQLite format 3\0" {
            return Err(DaytrackError::Database(format!(
                "Database file at '{}' is corrupted or not a valid SQLite database",
                db_path
            )));
        }

        debug!("Database file validation passed: {}", db_path);
        Ok(true)
    }

    /// Open (creating if needed) a store in the given mode and apply the schema
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        info!("Connecting to LibSQL store: {}", describe(&mode));

        let db = match mode {
            ConnectionMode::Local(ref path) => {
                Self::validate_database_file(path)?;

                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            DaytrackError::Database(format!(
                                "Failed to create database directory {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }

                Builder::new_local(path).build().await.map_err(|e| {
                    DaytrackError::Database(format!("Failed to create local database: {}", e))
                })?
            }
            ConnectionMode::InMemory => Builder::new_local(":memory:")
                .build()
                .await
                .map_err(|e| {
                    DaytrackError::Database(format!("Failed to create in-memory database: {}", e))
                })?,
            ConnectionMode::Remote { ref url, ref token } => {
                Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        DaytrackError::Database(format!("Failed to create remote database: {}", e))
                    })?
            }
        };

        // One shared connection: ":memory:" databases are private to a connection
        let conn = db
            .connect()
            .map_err(|e| DaytrackError::Database(format!("Failed to get connection: {}", e)))?;

        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| DaytrackError::Database(format!("Failed to apply schema: {}", e)))?;

        info!("LibSQL store ready");
        Ok(Self { _db: db, conn })
    }

    /// Create a local file-based store (convenience method)
    pub async fn new_local(path: &str) -> Result<Self> {
        Self::new(ConnectionMode::Local(path.to_string())).await
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(ConnectionMode::InMemory).await
    }

    /// Delete expired plain values; returns how many were removed
    pub async fn purge_expired(&self) -> Result<u64> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now_millis()],
            )
            .await?;
        debug!("Purged {} expired entries", removed);
        Ok(removed)
    }

    async fn fetch_chunk(&self, chunk: &[String], now: i64) -> Result<HashMap<String, String>> {
        let placeholders = (0..chunk.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT key, value FROM kv WHERE (expires_at IS NULL OR expires_at > ?1) AND key IN ({})",
            placeholders
        );

        let mut args = Vec::with_capacity(chunk.len() + 1);
        args.push(Value::Integer(now));
        args.extend(chunk.iter().map(|k| Value::Text(k.clone())));

        let mut rows = self.conn.query(&sql, args).await?;
        let mut found = HashMap::with_capacity(chunk.len());
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            found.insert(key, value);
        }
        Ok(found)
    }
}

fn describe(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => format!("local file {}", path),
        ConnectionMode::InMemory => "in-memory".to_string(),
        // Never log the token
        ConnectionMode::Remote { url, .. } => format!("remote {}", url),
    }
}

#[async_trait]
impl KvStore for LibsqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key.to_string(), now_millis()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
                "#,
                params![key.to_string(), value.to_string(), expiry_millis(ttl)],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key.to_string(), now_millis()],
            )
            .await?;
        let removed_members = self
            .conn
            .execute("DELETE FROM kv_sets WHERE key = ?1", params![key.to_string()])
            .await?;
        Ok(removed > 0 || removed_members > 0)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        // Expired values restart from zero; non-integer values leave the row
        // untouched, so RETURNING yields nothing.
        let mut rows = self
            .conn
            .query(
                r#"
                INSERT INTO kv (key, value, expires_at) VALUES (?1, CAST(?2 AS TEXT), NULL)
                ON CONFLICT(key) DO UPDATE SET
                    value = CASE
                        WHEN kv.expires_at IS NOT NULL AND kv.expires_at <= ?3 THEN CAST(?2 AS TEXT)
                        ELSE CAST(CAST(kv.value AS INTEGER) + ?2 AS TEXT)
                    END,
                    expires_at = CASE
                        WHEN kv.expires_at IS NOT NULL AND kv.expires_at <= ?3 THEN NULL
                        ELSE kv.expires_at
                    END
                WHERE (kv.expires_at IS NOT NULL AND kv.expires_at <= ?3)
                    OR (kv.value GLOB '[0-9]*' AND kv.value NOT GLOB '*[^0-9]*')
                    OR (kv.value GLOB '-[0-9]*' AND substr(kv.value, 2) NOT GLOB '*[^0-9]*')
                RETURNING value
                "#,
                params![key.to_string(), delta, now_millis()],
            )
            .await?;

        let row = rows.next().await?.ok_or_else(|| {
            DaytrackError::Database(format!("Value at '{}' is not an integer", key))
        })?;
        let raw: String = row.get(0)?;
        raw.parse::<i64>().map_err(|_| {
            DaytrackError::Database(format!("Value at '{}' is not an integer: {}", key, raw))
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT 1 FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)
                UNION ALL
                SELECT 1 FROM kv_sets WHERE key = ?1
                LIMIT 1
                "#,
                params![key.to_string(), now_millis()],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let now = now_millis();
        let mut found = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(BATCH_CHUNK) {
            found.extend(self.fetch_chunk(chunk, now).await?);
        }

        debug!("batch_get: {} keys, {} present", keys.len(), found.len());
        Ok(keys.iter().map(|k| found.get(k).cloned()).collect())
    }

    async fn compare_and_swap(&self, key: &str, expected: &str, new: &str) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                r#"
                UPDATE kv SET value = ?3
                WHERE key = ?1 AND value = ?2 AND (expires_at IS NULL OR expires_at > ?4)
                "#,
                params![key.to_string(), expected.to_string(), new.to_string(), now_millis()],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO kv_sets (key, member) VALUES (?1, ?2)",
                params![key.to_string(), member.to_string()],
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM kv_sets WHERE key = ?1 AND member = ?2",
                params![key.to_string(), member.to_string()],
            )
            .await?;
        Ok(removed == 1)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT member FROM kv_sets WHERE key = ?1 ORDER BY member",
                params![key.to_string()],
            )
            .await?;

        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(row.get::<String>(0)?);
        }
        Ok(members)
    }

    async fn ping(&self) -> Result<()> {
        self.conn
            .query("SELECT 1", params![])
            .await
            .map_err(|e| DaytrackError::Database(format!("Store is not reachable: {}", e)))?;

        let probe = "daytrack:ping";
        self.set(probe, "ok", Some(Duration::from_secs(60))).await?;
        let value = self.get(probe).await?;
        self.delete(probe).await?;

        if value.as_deref() != Some("ok") {
            return Err(DaytrackError::Database(
                "Store round trip returned an unexpected value".to_string(),
            ));
        }
        debug!("Store health check passed");
        Ok(())
    }
}
