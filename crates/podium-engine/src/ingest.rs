//! Score ingestion: validated, lock-guarded replacement of a competition's
//! score set
//!
//! Upload contract: first line exactly `player_id,score`, then one
//! `player_id,score` pair per line with a base-10 integer score. A row with
//! the wrong column count is skipped but still consumes its `row_num`
//! position, so `row_num` always reflects upload order.

use tracing::{debug, info};

use podium_core::{Error, PlayerScore, Result, TenantId};
use podium_storage::TenantLock;

use crate::Engine;

const UPLOAD_HEADER: &str = "player_id,score";

impl Engine {
    /// Replace the competition's score set with the uploaded batch,
    /// returning the number of accepted rows.
    ///
    /// Every validation step, ID minting included, runs before the lock-held
    /// delete: a rejected upload never touches existing rows. The delete and
    /// insert happen inside one lock hold so readers see either the old or
    /// the new set, never the empty window in between.
    pub async fn ingest_scores(
        &self,
        tenant_id: TenantId,
        competition_id: &str,
        upload: &str,
    ) -> Result<usize> {
        let store = self.registry.open(tenant_id).await?;

        let competition = store.competition(competition_id).await?;
        if competition.is_finished() {
            return Err(Error::Validation(format!(
                "competition is finished: {competition_id}"
            )));
        }

        let mut lines = upload.lines().map(|l| l.trim_end_matches('\r'));
        let header = lines
            .next()
            .ok_or_else(|| Error::Validation("empty score upload".to_string()))?;
        if header != UPLOAD_HEADER {
            return Err(Error::Validation(format!(
                "unexpected upload header: {header}"
            )));
        }

        let mut rows: Vec<PlayerScore> = Vec::new();
        let mut row_num: i64 = 0;
        for line in lines {
            row_num += 1;
            let mut columns = line.split(',');
            let (player_id, score_cell) = match (columns.next(), columns.next(), columns.next()) {
                (Some(p), Some(s), None) => (p, s),
                _ => {
                    debug!(row_num, "skipping row with unexpected column count");
                    continue;
                }
            };

            // unknown player is the caller's fault and aborts the upload
            store.player(player_id).await?;

            let score: i64 = score_cell.parse().map_err(|_| {
                Error::Validation(format!("invalid score value at row {row_num}: {score_cell}"))
            })?;

            let id = self.ids.dispense().await?;
            let now = Self::now();
            rows.push(PlayerScore {
                id,
                tenant_id,
                player_id: player_id.to_string(),
                competition_id: competition_id.to_string(),
                score,
                row_num,
                created_at: now,
                updated_at: now,
            });
        }

        let _lock = TenantLock::acquire(
            self.config.store_root(),
            tenant_id,
            self.config.lock_timeout(),
        )
        .await?;
        store.replace_scores(competition_id, &rows).await?;

        info!(
            %tenant_id,
            competition_id,
            accepted = rows.len(),
            total = row_num,
            "replaced competition scores"
        );
        Ok(rows.len())
    }
}
