//! Directory sync, read facade and rate-limited chain access

mod common;

use common::*;
use governance_sync::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_directory_upsert_skips_entries_without_address() {
    let h = Harness::new(105);
    h.directory.set_entries(vec![
        directory_entry(ALICE, "alice.eth", 10.0),
        json!({ "name": "nobody" }),
        directory_entry(BOB, "bob.eth", 20.0),
    ]);

    let report = h.directory_sync().sync().await.unwrap();

    assert_eq!(report.received, 3);
    assert_eq!(report.upserted, 2);
    assert_eq!(report.skipped, 1);

    let alice = h.store.get_orchestrator(ALICE).await.unwrap().unwrap();
    assert_eq!(alice.name, "alice.eth");
    assert_eq!(alice.total_stake, 10.0);
    assert_eq!(alice.fee_cut, 0.25);
    assert!(alice.active);
}

#[tokio::test]
async fn test_directory_refresh_overwrites_and_keeps_missing_records() {
    let h = Harness::new(105);
    h.directory.set_entries(vec![
        directory_entry(ALICE, "alice.eth", 10.0),
        directory_entry(BOB, "bob.eth", 20.0),
    ]);
    h.directory_sync().sync().await.unwrap();

    h.directory
        .set_entries(vec![directory_entry(ALICE, "alice-v2.eth", 15.0)]);
    h.directory_sync().sync().await.unwrap();

    let orchestrators = h.store.list_orchestrators().await.unwrap();
    assert_eq!(orchestrators.len(), 2);

    let alice = h.store.get_orchestrator(ALICE).await.unwrap().unwrap();
    assert_eq!(alice.name, "alice-v2.eth");
    assert_eq!(alice.total_stake, 15.0);

    let bob = h.store.get_orchestrator(BOB).await.unwrap().unwrap();
    assert_eq!(bob.name, "bob.eth");
}

#[tokio::test]
async fn test_directory_failure_changes_nothing() {
    let h = Harness::new(105);
    h.directory
        .set_entries(vec![directory_entry(ALICE, "alice.eth", 10.0)]);
    h.directory_sync().sync().await.unwrap();

    h.directory.fail(true);
    let err = h.directory_sync().sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Directory(_)));
    assert_eq!(h.store.list_orchestrators().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_proposals_listed_newest_first_with_votes_by_stake() {
    let h = Harness::new(110);
    h.rpc.push(proposal_created(101, "1", ALICE, "# Old"));
    h.rpc.push(proposal_created(104, "2", ALICE, "# New"));
    h.rpc.push(vote_cast(105, "1", BOB, 1, 1_000_000_000_000_000_000));
    h.rpc.push(vote_cast(106, "1", CAROL, 0, 4_000_000_000_000_000_000));
    h.rpc.push(vote_cast(107, "1", ALICE, 2, 2_500_000_000_000_000_000));

    h.proposals().ingest(110).await.unwrap();
    h.votes().ingest(110).await.unwrap();

    let views = h.query().list_proposals().await.unwrap();
    let ids: Vec<&str> = views.iter().map(|v| v.proposal.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);

    assert!(views[0].votes.is_empty());
    assert_eq!(views[0].total_stake_voted, 0.0);

    let stakes: Vec<f64> = views[1].votes.iter().map(|v| v.stake_amount).collect();
    assert_eq!(stakes, vec![4.0, 2.5, 1.0]);
    assert_eq!(views[1].total_stake_voted, 7.5);
    assert_eq!(views[1].proposal.total_stake_voted, 7.5);
}

#[tokio::test]
async fn test_reference_data_and_checkpoints() {
    let h = Harness::new(105);
    let query = h.query();

    assert_eq!(
        query.checkpoints().await.unwrap(),
        vec![(StreamKey::Proposals, None), (StreamKey::Votes, None)]
    );

    h.proposals().ingest(105).await.unwrap();
    assert_eq!(
        query.checkpoints().await.unwrap(),
        vec![(StreamKey::Proposals, Some(106)), (StreamKey::Votes, None)]
    );

    assert_eq!(query.list_regions().await.unwrap()[0]["id"], "FRA");
    assert_eq!(
        query.list_pipelines().await.unwrap()[0]["id"],
        "text-to-image"
    );

    let offline = GovernanceQuery::new(h.store.clone(), None);
    assert!(offline.list_regions().await.unwrap().is_empty());
    assert!(offline.list_pipelines().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_rpc_retries_through_ingestion() {
    let h = Harness::new(105);
    h.rpc.push(proposal_created(102, "42", ALICE, "# Fund X"));
    h.rpc.rate_limit_next(1);

    let limited = Arc::new(
        RateLimitedRpc::new(h.rpc.clone(), RateLimitConfig::default()).unwrap(),
    );
    let fetcher = Arc::new(EventFetcher::new(limited.clone()));
    let ingestor = ProposalIngestor::new(fetcher, h.store.clone(), h.checkpoints.clone());

    let report = ingestor.ingest(105).await.unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(h.rpc.log_calls(), 2);
    let stats = limited.limiter().stats();
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.retried, 1);
    assert_eq!(h.checkpoint(StreamKey::Proposals).await, Some(106));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_rate_limit_fails_the_pass() {
    let h = Harness::new(105);
    h.rpc.push(proposal_created(102, "42", ALICE, "# Fund X"));
    h.rpc.rate_limit_next(2);

    let limited = Arc::new(
        RateLimitedRpc::new(h.rpc.clone(), RateLimitConfig::default()).unwrap(),
    );
    let ingestor = ProposalIngestor::new(
        Arc::new(EventFetcher::new(limited)),
        h.store.clone(),
        h.checkpoints.clone(),
    );

    let err = ingestor.ingest(105).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Rpc(RpcError::RateLimited { .. })
    ));
    assert_eq!(h.checkpoint(StreamKey::Proposals).await, Some(GENESIS));
}
