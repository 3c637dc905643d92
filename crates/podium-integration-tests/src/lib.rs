//! End-to-end integration tests for Podium
//!
//! These tests wire the engine, storage and lock layers together against a
//! throwaway store root to verify the cross-store flows: provisioning,
//! ingestion, billing and ranking.

pub mod harness {
    use podium_core::{Competition, Player, TenantId};
    use podium_engine::Engine;
    use podium_storage::StoreConfig;
    use std::path::Path;

    /// Engine over the given store root with a short lock timeout so
    /// contention scenarios fail fast instead of stalling the suite.
    pub async fn engine_at(root: &Path) -> Engine {
        init_tracing();
        let mut config = StoreConfig::with_root(root);
        config.lock_timeout_ms = 1_000;
        Engine::open(config).await.expect("open engine")
    }

    /// Honor RUST_LOG when the suite runs; repeated init attempts are fine.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// One tenant with the given players and one open competition.
    pub async fn seeded_tenant(
        engine: &Engine,
        slug: &str,
        player_names: &[&str],
    ) -> (TenantId, Vec<Player>, Competition) {
        let tenant = engine.create_tenant(slug, "Test Tenant").await.unwrap();
        let names: Vec<String> = player_names.iter().map(|n| n.to_string()).collect();
        let players = engine.add_players(tenant.id, &names).await.unwrap();
        let competition = engine
            .add_competition(tenant.id, "integration cup")
            .await
            .unwrap();
        (tenant.id, players, competition)
    }

    /// Upload body for the given (player, score) pairs.
    pub fn upload(rows: &[(&str, i64)]) -> String {
        let mut body = String::from("player_id,score\n");
        for (player_id, score) in rows {
            body.push_str(&format!("{player_id},{score}\n"));
        }
        body
    }
}
