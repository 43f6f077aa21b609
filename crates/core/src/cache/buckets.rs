//! Bucket lifecycle operations.
//!
//! Buckets are created lazily by name, enumerated in creation order, and
//! deleted together with every snapshot they hold.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BucketInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Create a bucket if it doesn't exist yet.
    ///
    /// Returns true if the bucket was created by this call.
    pub async fn open_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at, seq)
                    VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM buckets))",
                    params![name, created_at],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a bucket exists.
    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All bucket names, oldest first.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All buckets with their entry counts, oldest first.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<BucketInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT b.name, b.created_at, COUNT(s.key_hash)
                    FROM buckets b LEFT JOIN snapshots s ON s.bucket = b.name
                    GROUP BY b.name
                    ORDER BY b.seq ASC",
                )?;
                let buckets = stmt
                    .query_map([], |row| {
                        Ok(BucketInfo { name: row.get(0)?, created_at: row.get(1)?, entries: row.get::<_, i64>(2)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(buckets)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and all of its snapshots.
    ///
    /// Returns false if the bucket did not exist.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                conn.execute("DELETE FROM snapshots WHERE bucket = ?1", params![name])?;
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheDb;

    #[tokio::test]
    async fn test_open_bucket_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_bucket("app-v1-static").await.unwrap());
        assert!(!db.open_bucket("app-v1-static").await.unwrap());
        assert_eq!(db.bucket_names().await.unwrap(), vec!["app-v1-static".to_string()]);
    }

    #[tokio::test]
    async fn test_bucket_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("zeta").await.unwrap();
        db.open_bucket("alpha").await.unwrap();
        db.open_bucket("mid").await.unwrap();

        assert_eq!(db.bucket_names().await.unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_delete_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("app-v1-dynamic").await.unwrap();

        assert!(db.delete_bucket("app-v1-dynamic").await.unwrap());
        assert!(!db.has_bucket("app-v1-dynamic").await.unwrap());
        assert!(!db.delete_bucket("app-v1-dynamic").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_buckets_counts_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("empty").await.unwrap();
        db.open_bucket("full").await.unwrap();

        let listed = db.list_buckets().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "empty");
        assert_eq!(listed[0].entries, 0);
    }
}
