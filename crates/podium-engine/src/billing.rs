//! Billing aggregation: the central/tenant cross-store join
//!
//! Rates: 100 yen per player (scored), 10 yen per visitor (viewed the
//! ranking but never scored). Scoring supersedes visiting. Billing accrues
//! only once the competition is finished; a first visit strictly after the
//! close does not count as participation.

use std::collections::HashMap;
use tracing::debug;

use podium_core::{BillingReport, Result, TenantBilling, TenantId};
use podium_storage::{TenantLock, TenantStore};

use crate::Engine;

const PLAYER_RATE_YEN: i64 = 100;
const VISITOR_RATE_YEN: i64 = 10;

/// Upper bound on tenants per page of the SaaS-wide report.
pub const TENANT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Visitor,
    Player,
}

impl Engine {
    /// Billing report for one competition of one tenant.
    pub async fn billing_report(
        &self,
        tenant_id: TenantId,
        competition_id: &str,
    ) -> Result<BillingReport> {
        let store = self.registry.open(tenant_id).await?;
        self.billing_report_with(&store, tenant_id, competition_id)
            .await
    }

    /// Shared worker reusing an already opened tenant store.
    async fn billing_report_with(
        &self,
        store: &TenantStore,
        tenant_id: TenantId,
        competition_id: &str,
    ) -> Result<BillingReport> {
        let competition = store.competition(competition_id).await?;

        let mut categories: HashMap<String, Category> = HashMap::new();
        for (player_id, first_visit) in
            self.central.first_visits(tenant_id, competition_id).await?
        {
            // a first visit after the close is not participation
            if let Some(finished_at) = competition.finished_at {
                if first_visit > finished_at {
                    continue;
                }
            }
            categories.insert(player_id, Category::Visitor);
        }

        // a concurrent score replace mid-read would skew the tally
        let _lock = TenantLock::acquire(
            self.config.store_root(),
            tenant_id,
            self.config.lock_timeout(),
        )
        .await?;
        for player_id in store.scored_player_ids(competition_id).await? {
            categories.insert(player_id, Category::Player);
        }

        // an unfinished competition always bills zero
        let (mut player_count, mut visitor_count) = (0i64, 0i64);
        if competition.is_finished() {
            for category in categories.values() {
                match category {
                    Category::Player => player_count += 1,
                    Category::Visitor => visitor_count += 1,
                }
            }
        }

        debug!(
            %tenant_id,
            competition_id,
            player_count,
            visitor_count,
            "computed billing report"
        );
        Ok(BillingReport {
            competition_id: competition.id,
            competition_title: competition.title,
            player_count,
            visitor_count,
            billing_player_yen: PLAYER_RATE_YEN * player_count,
            billing_visitor_yen: VISITOR_RATE_YEN * visitor_count,
            billing_yen: PLAYER_RATE_YEN * player_count + VISITOR_RATE_YEN * visitor_count,
        })
    }

    /// Per-tenant billing: one report per competition, newest first.
    pub async fn tenant_billing_reports(&self, tenant_id: TenantId) -> Result<Vec<BillingReport>> {
        let store = self.registry.open(tenant_id).await?;

        let competitions = store.list_competitions().await?;
        let mut reports = Vec::with_capacity(competitions.len());
        for competition in &competitions {
            reports.push(
                self.billing_report_with(&store, tenant_id, &competition.id)
                    .await?,
            );
        }
        Ok(reports)
    }

    /// SaaS-wide billing: tenants by ID descending, summed over their
    /// competitions, paginated by the exclusive `before` cursor.
    pub async fn saas_billing(&self, before: Option<i64>) -> Result<Vec<TenantBilling>> {
        let mut pages = Vec::new();
        for tenant in self.central.list_tenants_desc().await? {
            if let Some(before) = before {
                if tenant.id.0 >= before {
                    continue;
                }
            }

            let store = self.registry.open(tenant.id).await?;
            let mut billing_yen = 0;
            for competition in store.list_competitions().await? {
                billing_yen += self
                    .billing_report_with(&store, tenant.id, &competition.id)
                    .await?
                    .billing_yen;
            }

            pages.push(TenantBilling {
                id: tenant.id.to_string(),
                name: tenant.name,
                display_name: tenant.display_name,
                billing_yen,
            });
            if pages.len() >= TENANT_PAGE_SIZE {
                break;
            }
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::TENANT_PAGE_SIZE;
    use crate::test_util::{open_competition, tenant_with_players, test_engine};
    use podium_core::TenantId;

    #[tokio::test]
    async fn two_rate_formula_over_players_and_visitors() {
        let (_dir, engine) = test_engine().await;
        let (tenant, players) =
            tenant_with_players(&engine, &["alice", "bob", "carol", "dave"]).await;
        let competition = open_competition(&engine, tenant).await;

        // alice and bob score; carol only visits; dave does both
        let upload = format!(
            "player_id,score\n{},10\n{},20\n{},5\n",
            players[0].id, players[1].id, players[3].id
        );
        engine
            .ingest_scores(tenant, &competition.id, &upload)
            .await
            .unwrap();
        for visitor in [&players[2], &players[3]] {
            engine
                .competition_ranking(tenant, &visitor.id, &competition.id, 0)
                .await
                .unwrap();
        }
        engine
            .finish_competition(tenant, &competition.id)
            .await
            .unwrap();

        let report = engine
            .billing_report(tenant, &competition.id)
            .await
            .unwrap();
        assert_eq!(report.player_count, 3);
        assert_eq!(report.visitor_count, 1);
        assert_eq!(report.billing_player_yen, 300);
        assert_eq!(report.billing_visitor_yen, 10);
        assert_eq!(report.billing_yen, 310);
    }

    #[tokio::test]
    async fn unfinished_competition_bills_zero() {
        let (_dir, engine) = test_engine().await;
        let (tenant, players) = tenant_with_players(&engine, &["alice"]).await;
        let competition = open_competition(&engine, tenant).await;

        let upload = format!("player_id,score\n{},10\n", players[0].id);
        engine
            .ingest_scores(tenant, &competition.id, &upload)
            .await
            .unwrap();
        engine
            .competition_ranking(tenant, &players[0].id, &competition.id, 0)
            .await
            .unwrap();

        let report = engine
            .billing_report(tenant, &competition.id)
            .await
            .unwrap();
        assert_eq!(report.player_count, 0);
        assert_eq!(report.visitor_count, 0);
        assert_eq!(report.billing_yen, 0);
    }

    #[tokio::test]
    async fn visit_after_close_does_not_count() {
        let (_dir, engine) = test_engine().await;
        let (tenant, players) = tenant_with_players(&engine, &["alice", "bob"]).await;
        let competition = open_competition(&engine, tenant).await;

        let upload = format!("player_id,score\n{},10\n", players[0].id);
        engine
            .ingest_scores(tenant, &competition.id, &upload)
            .await
            .unwrap();
        engine
            .finish_competition(tenant, &competition.id)
            .await
            .unwrap();

        // bob's first (and only) visit lands strictly after finished_at
        let finished_at = engine
            .registry()
            .open(tenant)
            .await
            .unwrap()
            .competition(&competition.id)
            .await
            .unwrap()
            .finished_at
            .unwrap();
        engine
            .central()
            .record_visit(&players[1].id, tenant, &competition.id, finished_at + 60)
            .await
            .unwrap();

        let report = engine
            .billing_report(tenant, &competition.id)
            .await
            .unwrap();
        assert_eq!(report.player_count, 1);
        assert_eq!(report.visitor_count, 0);
        assert_eq!(report.billing_yen, 100);
    }

    #[tokio::test]
    async fn scoring_supersedes_visiting() {
        let (_dir, engine) = test_engine().await;
        let (tenant, players) = tenant_with_players(&engine, &["alice"]).await;
        let competition = open_competition(&engine, tenant).await;

        engine
            .competition_ranking(tenant, &players[0].id, &competition.id, 0)
            .await
            .unwrap();
        let upload = format!("player_id,score\n{},10\n", players[0].id);
        engine
            .ingest_scores(tenant, &competition.id, &upload)
            .await
            .unwrap();
        engine
            .finish_competition(tenant, &competition.id)
            .await
            .unwrap();

        let report = engine
            .billing_report(tenant, &competition.id)
            .await
            .unwrap();
        // alice visited and scored: billed once, as a player
        assert_eq!(report.player_count, 1);
        assert_eq!(report.visitor_count, 0);
        assert_eq!(report.billing_yen, 100);
    }

    #[tokio::test]
    async fn tenant_reports_cover_every_competition() {
        let (_dir, engine) = test_engine().await;
        let (tenant, players) = tenant_with_players(&engine, &["alice"]).await;
        let first = open_competition(&engine, tenant).await;
        let second = engine.add_competition(tenant, "autumn cup").await.unwrap();

        let upload = format!("player_id,score\n{},10\n", players[0].id);
        engine.ingest_scores(tenant, &first.id, &upload).await.unwrap();
        engine.finish_competition(tenant, &first.id).await.unwrap();

        let reports = engine.tenant_billing_reports(tenant).await.unwrap();
        assert_eq!(reports.len(), 2);
        let by_id = |id: &str| reports.iter().find(|r| r.competition_id == id).unwrap();
        assert_eq!(by_id(&first.id).billing_yen, 100);
        assert_eq!(by_id(&second.id).billing_yen, 0);
    }

    #[tokio::test]
    async fn saas_billing_paginates_by_descending_id_cursor() {
        let (_dir, engine) = test_engine().await;

        let mut tenant_ids = Vec::new();
        for i in 0..(TENANT_PAGE_SIZE + 3) {
            let tenant = engine
                .create_tenant(&format!("tenant-{i}"), "T")
                .await
                .unwrap();
            tenant_ids.push(tenant.id.0);
        }

        let first_page = engine.saas_billing(None).await.unwrap();
        assert_eq!(first_page.len(), TENANT_PAGE_SIZE);
        let page_ids: Vec<i64> = first_page.iter().map(|t| t.id.parse().unwrap()).collect();
        let mut expected = tenant_ids.clone();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(page_ids, expected[..TENANT_PAGE_SIZE]);

        // `before` is an exclusive upper bound
        let cursor = page_ids[page_ids.len() - 1];
        let second_page = engine.saas_billing(Some(cursor)).await.unwrap();
        let second_ids: Vec<i64> = second_page.iter().map(|t| t.id.parse().unwrap()).collect();
        assert_eq!(second_ids, expected[TENANT_PAGE_SIZE..]);
        assert!(second_ids.iter().all(|id| *id < cursor));
    }

    #[tokio::test]
    async fn unknown_tenant_store_is_not_found() {
        let (_dir, engine) = test_engine().await;
        let err = engine
            .billing_report(TenantId(404), "c1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
