//! Storage configuration
//!
//! Handles are constructed explicitly from this config and passed down the
//! call chain; there is no module-level singleton.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the store root and its shared resources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `central.db`, the per-tenant `{id}.db` files and
    /// the per-tenant `{id}.lock` files.
    pub store_root: PathBuf,

    /// Upper bound of the central store connection pool.
    pub central_max_connections: u32,

    /// How long a caller waits for the exclusive tenant lock before the
    /// operation is aborted with a timeout error.
    pub lock_timeout_ms: u64,

    /// Retry budget for ID dispensing on write conflicts.
    pub id_retry_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("data"),
            central_max_connections: 10,
            lock_timeout_ms: 5_000,
            id_retry_attempts: 100,
        }
    }
}

impl StoreConfig {
    /// Config rooted at the given directory, defaults elsewhere.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: root.into(),
            ..Self::default()
        }
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
