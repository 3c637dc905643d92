//! Ranking: deduplicated, ordered, paginated leaderboard for one competition
//!
//! Ordering: score descending; equal scores rank the earlier-uploaded row
//! (smaller `row_num`) first. Ranks are dense, 1..N.

use std::collections::HashSet;

use podium_core::{CompetitionRank, CompetitionSummary, Error, RankingPage, Result, TenantId};
use podium_storage::TenantLock;

use crate::Engine;

/// Upper bound on leaderboard entries per page.
pub const RANKING_PAGE_SIZE: usize = 100;

impl Engine {
    /// Leaderboard page for one competition, as seen by one viewing player.
    ///
    /// Every view appends a visit record before the scores are read: a
    /// viewer who never scores still counts for billing as a visitor.
    /// `rank_after` is an exclusive lower bound on rank.
    pub async fn competition_ranking(
        &self,
        tenant_id: TenantId,
        viewer_player_id: &str,
        competition_id: &str,
        rank_after: i64,
    ) -> Result<RankingPage> {
        let store = self.registry.open(tenant_id).await?;

        let competition = store.competition(competition_id).await?;
        let viewer = store.player(viewer_player_id).await?;
        if viewer.is_disqualified {
            return Err(Error::Disqualified(viewer.id));
        }

        self.central
            .record_visit(&viewer.id, tenant_id, competition_id, Self::now())
            .await?;

        // a concurrent score replace would expose the empty delete window
        let _lock = TenantLock::acquire(
            self.config.store_root(),
            tenant_id,
            self.config.lock_timeout(),
        )
        .await?;

        // rows arrive ordered row_num descending; the first row seen per
        // player is its authoritative score
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries = Vec::new();
        for row in store.scores_desc_by_row_num(competition_id).await? {
            if !seen.insert(row.player_id.clone()) {
                continue;
            }
            let player = store.player(&row.player_id).await?;
            entries.push((row.score, row.row_num, player.id, player.display_name));
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut ranks = Vec::new();
        for (position, (score, _row_num, player_id, player_display_name)) in
            entries.into_iter().enumerate()
        {
            let rank = position as i64 + 1;
            if rank <= rank_after {
                continue;
            }
            ranks.push(CompetitionRank {
                rank,
                score,
                player_id,
                player_display_name,
            });
            if ranks.len() >= RANKING_PAGE_SIZE {
                break;
            }
        }

        Ok(RankingPage {
            competition: CompetitionSummary::from(&competition),
            ranks,
        })
    }
}
