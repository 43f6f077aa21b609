//! Response snapshot operations.
//!
//! Provides functions for storing, matching, and purging cached
//! responses inside named buckets.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response snapshot.
///
/// Holds everything needed to replay the response byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bucket: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub status_text: Option<String>,
    pub content_type: Option<String>,
    /// Response headers as a JSON array of `[name, value]` pairs.
    pub headers_json: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl Snapshot {
    /// Decode the stored header list.
    pub fn headers(&self) -> Result<Vec<(String, String)>, Error> {
        serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptSnapshot(format!("{}: {e}", self.url)))
    }
}

const SNAPSHOT_COLUMNS: &str = "s.bucket, s.key_hash, s.method, s.url, s.status_code, s.status_text,
    s.content_type, s.headers_json, s.body, s.stored_at";

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        bucket: row.get(0)?,
        key_hash: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status_code: row.get(4)?,
        status_text: row.get(5)?,
        content_type: row.get(6)?,
        headers_json: row.get(7)?,
        body: row.get(8)?,
        stored_at: row.get(9)?,
    })
}

impl CacheDb {
    /// Insert or replace a snapshot in its bucket.
    ///
    /// Creates the bucket if needed. Uses UPSERT semantics on
    /// (bucket, key_hash), so a later put overwrites an earlier one.
    pub async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let snapshot = snapshot.clone();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at, seq)
                    VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM buckets))",
                    params![&snapshot.bucket, created_at],
                )?;
                conn.execute(
                    "INSERT INTO snapshots (
                    bucket, key_hash, method, url, status_code, status_text,
                    content_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(bucket, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status_code = excluded.status_code,
                    status_text = excluded.status_text,
                    content_type = excluded.content_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &snapshot.bucket,
                        &snapshot.key_hash,
                        &snapshot.method,
                        &snapshot.url,
                        snapshot.status_code,
                        &snapshot.status_text,
                        &snapshot.content_type,
                        &snapshot.headers_json,
                        &snapshot.body,
                        &snapshot.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a snapshot in one bucket.
    ///
    /// Returns None if the bucket or the key doesn't exist.
    pub async fn match_snapshot(&self, bucket: &str, key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let bucket = bucket.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots s WHERE s.bucket = ?1 AND s.key_hash = ?2");
                let mut stmt = conn.prepare(&sql)?;

                match stmt.query_row(params![bucket, key_hash], row_to_snapshot) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a snapshot in any bucket, oldest bucket first.
    pub async fn match_any(&self, key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let sql = format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots s
                    JOIN buckets b ON b.name = s.bucket
                    WHERE s.key_hash = ?1
                    ORDER BY b.seq ASC LIMIT 1"
                );
                let mut stmt = conn.prepare(&sql)?;

                match stmt.query_row(params![key_hash], row_to_snapshot) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a snapshot in each of `buckets`, in the given order.
    ///
    /// Returns the first hit; missing buckets are skipped.
    pub async fn match_in(&self, buckets: &[String], key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let buckets = buckets.to_vec();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots s WHERE s.bucket = ?1 AND s.key_hash = ?2");
                let mut stmt = conn.prepare(&sql)?;

                for bucket in &buckets {
                    match stmt.query_row(params![bucket, key_hash], row_to_snapshot) {
                        Ok(s) => return Ok(Some(s)),
                        Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of snapshots in a bucket.
    pub async fn count_snapshots(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM snapshots WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete snapshots whose URL matches a domain pattern, in every bucket.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_snapshots_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM snapshots WHERE url LIKE ?1", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge a bucket's oldest entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru_snapshots(&self, bucket: &str, max_entries: usize) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM snapshots WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM snapshots WHERE bucket = ?1 AND key_hash IN (
                    SELECT key_hash FROM snapshots WHERE bucket = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![bucket, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
