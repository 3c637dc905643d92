//! Full tenant lifecycle: provision, upload, rank, finish, bill.

use podium_integration_tests::harness::{engine_at, seeded_tenant, upload};
use tempfile::TempDir;

#[tokio::test]
async fn full_scoring_and_billing_flow() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(dir.path()).await;
    let (tenant, players, competition) =
        seeded_tenant(&engine, "acme", &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (&players[0], &players[1], &players[2]);

    // alice appears twice; her later row is authoritative
    let body = upload(&[(&alice.id, 10), (&bob.id, 20), (&alice.id, 15)]);
    let accepted = engine
        .ingest_scores(tenant, &competition.id, &body)
        .await
        .unwrap();
    assert_eq!(accepted, 3);

    // carol views the ranking but never scores
    let page = engine
        .competition_ranking(tenant, &carol.id, &competition.id, 0)
        .await
        .unwrap();
    assert_eq!(page.competition.id, competition.id);
    let observed: Vec<(i64, i64, &str)> = page
        .ranks
        .iter()
        .map(|r| (r.rank, r.score, r.player_id.as_str()))
        .collect();
    assert_eq!(
        observed,
        vec![(1, 20, bob.id.as_str()), (2, 15, alice.id.as_str())]
    );

    // billing stays zero while the competition is open
    let open_report = engine
        .billing_report(tenant, &competition.id)
        .await
        .unwrap();
    assert_eq!(open_report.billing_yen, 0);

    engine
        .finish_competition(tenant, &competition.id)
        .await
        .unwrap();

    // two scorers at 100 yen, one pure visitor at 10 yen
    let report = engine
        .billing_report(tenant, &competition.id)
        .await
        .unwrap();
    assert_eq!(report.competition_title, "integration cup");
    assert_eq!(report.player_count, 2);
    assert_eq!(report.visitor_count, 1);
    assert_eq!(report.billing_yen, 210);

    let tenant_reports = engine.tenant_billing_reports(tenant).await.unwrap();
    assert_eq!(tenant_reports.len(), 1);
    assert_eq!(tenant_reports[0], report);

    let saas = engine.saas_billing(None).await.unwrap();
    assert_eq!(saas.len(), 1);
    assert_eq!(saas[0].name, "acme");
    assert_eq!(saas[0].billing_yen, 210);

    // per-player report carries the authoritative score only
    let (player, scores) = engine
        .player_scores(tenant, &bob.id, &alice.id)
        .await
        .unwrap();
    assert_eq!(player.display_name, "alice");
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 15);
}

#[tokio::test]
async fn tenants_are_fully_isolated() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(dir.path()).await;
    let (left, left_players, left_comp) = seeded_tenant(&engine, "left", &["alice"]).await;
    let (right, right_players, right_comp) = seeded_tenant(&engine, "right", &["alice"]).await;

    // same display name, different tenants, distinct global ids
    assert_ne!(left_players[0].id, right_players[0].id);

    engine
        .ingest_scores(left, &left_comp.id, &upload(&[(&left_players[0].id, 42)]))
        .await
        .unwrap();

    // the right tenant sees none of it
    let page = engine
        .competition_ranking(right, &right_players[0].id, &right_comp.id, 0)
        .await
        .unwrap();
    assert!(page.ranks.is_empty());

    engine.finish_competition(right, &right_comp.id).await.unwrap();
    let report = engine.billing_report(right, &right_comp.id).await.unwrap();
    // the right tenant's own visit is its only billable activity
    assert_eq!(report.player_count, 0);
    assert_eq!(report.visitor_count, 1);
    assert_eq!(report.billing_yen, 10);
}

#[tokio::test]
async fn ranking_survives_process_reopen() {
    let dir = TempDir::new().unwrap();
    let (tenant, viewer_id, competition_id) = {
        let engine = engine_at(dir.path()).await;
        let (tenant, players, competition) = seeded_tenant(&engine, "acme", &["alice"]).await;
        engine
            .ingest_scores(tenant, &competition.id, &upload(&[(&players[0].id, 9)]))
            .await
            .unwrap();
        (tenant, players[0].id.clone(), competition.id.clone())
    };

    // a fresh engine over the same store root sees the same data
    let engine = engine_at(dir.path()).await;
    let page = engine
        .competition_ranking(tenant, &viewer_id, &competition_id, 0)
        .await
        .unwrap();
    assert_eq!(page.ranks.len(), 1);
    assert_eq!(page.ranks[0].score, 9);
}
