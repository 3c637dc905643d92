//! Podium Storage Layer
//!
//! Tenant-sharded storage built on SQLite:
//! - Central directory store (tenant registry, visit history, ID counter)
//! - Per-tenant stores addressed purely by the numeric tenant ID
//! - Global ID dispenser usable from any tenant context
//! - Exclusive per-tenant advisory lock serializing score replacement
//!   against aggregation reads

pub mod central;
pub mod config;
pub mod id;
pub mod lock;
pub mod tenant_store;

pub use central::CentralStore;
pub use config::StoreConfig;
pub use id::IdDispenser;
pub use lock::TenantLock;
pub use tenant_store::{TenantStore, TenantStoreRegistry, store_path};

use podium_core::Error;

/// Map a driver error to the crate-level database error.
pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}
