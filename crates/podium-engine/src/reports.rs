//! Per-player score report: one player's authoritative score in each
//! competition they appear in, competitions in creation order.

use podium_core::{Error, Player, PlayerScoreReport, Result, TenantId};
use podium_storage::TenantLock;

use crate::Engine;

impl Engine {
    /// Score report for `player_id`, requested by `viewer_player_id`.
    ///
    /// Reads run under the tenant lock so a concurrent score replace cannot
    /// produce a report mixing old and new batches.
    pub async fn player_scores(
        &self,
        tenant_id: TenantId,
        viewer_player_id: &str,
        player_id: &str,
    ) -> Result<(Player, Vec<PlayerScoreReport>)> {
        let store = self.registry.open(tenant_id).await?;

        let viewer = store.player(viewer_player_id).await?;
        if viewer.is_disqualified {
            return Err(Error::Disqualified(viewer.id));
        }
        let player = store.player(player_id).await?;
        let competitions = store.list_competitions_asc().await?;

        let _lock = TenantLock::acquire(
            self.config.store_root(),
            tenant_id,
            self.config.lock_timeout(),
        )
        .await?;

        let mut reports = Vec::new();
        for competition in &competitions {
            // no row means the player never scored in this competition
            if let Some(score) = store.latest_score(&competition.id, &player.id).await? {
                reports.push(PlayerScoreReport {
                    competition_title: competition.title.clone(),
                    score: score.score,
                });
            }
        }
        Ok((player, reports))
    }
}
