//! Global unique-ID dispenser
//!
//! IDs are minted from a single counter row in the central store so that
//! primary keys never collide between central-store and tenant-store rows.
//! The single hot row is a deliberate tradeoff: generation stays trivial and
//! write conflicts are absorbed by a bounded retry loop.

use sqlx::sqlite::SqlitePool;
use tracing::warn;

use podium_core::{Error, Result};

use crate::db_err;

#[derive(Clone)]
pub struct IdDispenser {
    pool: SqlitePool,
    attempts: u32,
}

impl IdDispenser {
    /// Dispenser backed by the central store's pool.
    pub fn new(pool: SqlitePool, attempts: u32) -> Self {
        Self { pool, attempts }
    }

    /// Mint one globally unique ID.
    ///
    /// REPLACE against the unique stub column deletes and reinserts the
    /// counter row, advancing the AUTOINCREMENT rowid; that rowid is the
    /// dispensed value. Busy/locked conflicts are retried up to the
    /// configured budget, then surfaced as `IdExhausted`.
    pub async fn dispense(&self) -> Result<String> {
        let mut last_err = None;
        for _ in 0..self.attempts {
            match sqlx::query("REPLACE INTO id_generator (stub) VALUES ('a')")
                .execute(&self.pool)
                .await
            {
                Ok(res) => return Ok(res.last_insert_rowid().to_string()),
                Err(e) if is_write_conflict(&e) => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(db_err(e)),
            }
        }
        warn!(attempts = self.attempts, "id dispenser retries exhausted");
        Err(Error::IdExhausted(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no conflict recorded".to_string()),
        ))
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) are the transient lock/deadlock
/// class; anything else is fatal.
fn is_write_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5") | Some("6"))
                || db.message().contains("database is locked")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::central::CentralStore;
    use crate::config::StoreConfig;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn dispenser() -> (TempDir, IdDispenser) {
        let dir = TempDir::new().unwrap();
        let central = CentralStore::open(&StoreConfig::with_root(dir.path()))
            .await
            .unwrap();
        (dir, IdDispenser::new(central.pool().clone(), 100))
    }

    #[tokio::test]
    async fn ids_are_distinct_and_increasing() {
        let (_dir, ids) = dispenser().await;

        let a: i64 = ids.dispense().await.unwrap().parse().unwrap();
        let b: i64 = ids.dispense().await.unwrap().parse().unwrap();
        let c: i64 = ids.dispense().await.unwrap().parse().unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn concurrent_dispense_yields_distinct_ids() {
        let (_dir, ids) = dispenser().await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ids = ids.clone();
            handles.push(tokio::spawn(async move { ids.dispense().await.unwrap() }));
        }
        let mut seen = HashSet::new();
        for h in handles {
            assert!(seen.insert(h.await.unwrap()));
        }
        assert_eq!(seen.len(), 50);
    }
}
