//! Tenant provisioning and per-tenant entity management

use tracing::{info, warn};

use podium_core::{Competition, Player, Result, Tenant, TenantId, validate_tenant_name};

use crate::Engine;

impl Engine {
    /// Create a tenant: validate the slug, insert the directory row, then
    /// provision the isolated store.
    ///
    /// The two writes must succeed or fail together. Provisioning failure
    /// triggers a compensating delete of the directory row so no orphaned
    /// tenant (a tenant with no store) is left behind.
    pub async fn create_tenant(&self, name: &str, display_name: &str) -> Result<Tenant> {
        validate_tenant_name(name)?;

        let now = Self::now();
        let tenant = self.central.insert_tenant(name, display_name, now).await?;

        if let Err(provision_err) = self.registry.provision(tenant.id).await {
            warn!(
                tenant = %tenant.id,
                name,
                error = %provision_err,
                "store provisioning failed, rolling back directory insert"
            );
            if let Err(delete_err) = self.central.delete_tenant(tenant.id).await {
                warn!(
                    tenant = %tenant.id,
                    error = %delete_err,
                    "compensating tenant delete failed, directory row is orphaned"
                );
            }
            return Err(provision_err);
        }

        info!(tenant = %tenant.id, name, "created tenant");
        Ok(tenant)
    }

    /// Add one player per display name, each with a freshly dispensed ID.
    pub async fn add_players(
        &self,
        tenant_id: TenantId,
        display_names: &[String],
    ) -> Result<Vec<Player>> {
        let store = self.registry.open(tenant_id).await?;

        let mut players = Vec::with_capacity(display_names.len());
        for display_name in display_names {
            let id = self.ids.dispense().await?;
            let now = Self::now();
            let player = Player {
                id,
                tenant_id,
                display_name: display_name.clone(),
                is_disqualified: false,
                created_at: now,
                updated_at: now,
            };
            store.insert_player(&player).await?;
            players.push(player);
        }
        Ok(players)
    }

    pub async fn disqualify_player(&self, tenant_id: TenantId, player_id: &str) -> Result<Player> {
        let store = self.registry.open(tenant_id).await?;
        store.disqualify_player(player_id, Self::now()).await
    }

    pub async fn add_competition(&self, tenant_id: TenantId, title: &str) -> Result<Competition> {
        let store = self.registry.open(tenant_id).await?;

        let id = self.ids.dispense().await?;
        let now = Self::now();
        let competition = Competition {
            id,
            tenant_id,
            title: title.to_string(),
            finished_at: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_competition(&competition).await?;
        Ok(competition)
    }

    pub async fn finish_competition(
        &self,
        tenant_id: TenantId,
        competition_id: &str,
    ) -> Result<Competition> {
        let store = self.registry.open(tenant_id).await?;
        store.finish_competition(competition_id, Self::now()).await
    }

    pub async fn list_players(&self, tenant_id: TenantId) -> Result<Vec<Player>> {
        self.registry.open(tenant_id).await?.list_players().await
    }

    pub async fn list_competitions(&self, tenant_id: TenantId) -> Result<Vec<Competition>> {
        self.registry
            .open(tenant_id)
            .await?
            .list_competitions()
            .await
    }
}
