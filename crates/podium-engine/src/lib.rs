//! Podium Engine
//!
//! Competition-scoring operations over the tenant-sharded stores:
//! - Tenant provisioning (directory insert + store creation, all or nothing)
//! - Score ingestion (validated, lock-guarded replace)
//! - Billing aggregation (central/tenant cross-store join)
//! - Ranking (deduplicated, paginated leaderboard)
//!
//! The engine holds explicitly constructed store handles and passes them
//! through the call chain; nothing here is process-global.

pub mod billing;
pub mod ingest;
pub mod ranking;
pub mod reports;
pub mod tenants;

use podium_core::Result;
use podium_storage::{CentralStore, IdDispenser, StoreConfig, TenantStoreRegistry};

/// All engine operations hang off this handle bundle. Cloning is cheap; the
/// central pool is shared, tenant stores are opened per operation.
#[derive(Clone)]
pub struct Engine {
    config: StoreConfig,
    central: CentralStore,
    registry: TenantStoreRegistry,
    ids: IdDispenser,
}

impl Engine {
    /// Open the central store under the configured root and wire up the
    /// registry and ID dispenser.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let central = CentralStore::open(&config).await?;
        let ids = IdDispenser::new(central.pool().clone(), config.id_retry_attempts);
        let registry = TenantStoreRegistry::new(config.store_root());
        Ok(Self {
            config,
            central,
            registry,
            ids,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn central(&self) -> &CentralStore {
        &self.central
    }

    pub fn registry(&self) -> &TenantStoreRegistry {
        &self.registry
    }

    pub fn ids(&self) -> &IdDispenser {
        &self.ids
    }

    pub(crate) fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use podium_core::{Competition, Player, TenantId};
    use tempfile::TempDir;

    /// Engine over a throwaway store root with a short lock timeout so
    /// contention tests finish quickly.
    pub async fn test_engine() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let mut config = StoreConfig::with_root(dir.path());
        config.lock_timeout_ms = 500;
        let engine = Engine::open(config).await.unwrap();
        (dir, engine)
    }

    pub async fn tenant_with_players(
        engine: &Engine,
        names: &[&str],
    ) -> (TenantId, Vec<Player>) {
        let tenant = engine.create_tenant("acme", "Acme Corp").await.unwrap();
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let players = engine.add_players(tenant.id, &names).await.unwrap();
        (tenant.id, players)
    }

    pub async fn open_competition(engine: &Engine, tenant: TenantId) -> Competition {
        engine.add_competition(tenant, "spring open").await.unwrap()
    }
}
