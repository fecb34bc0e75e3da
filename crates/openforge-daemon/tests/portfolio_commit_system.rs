use std::sync::Arc;

use tempfile::TempDir;

use openforge_core::market::AllocationRequest;
use openforge_core::model::{Cluster, ClusterStage, Participant, Principal, Role, Team};
use openforge_core::ForgeError;
use openforge_daemon::audit::AuditLog;
use openforge_daemon::clock::FixedClock;
use openforge_daemon::config::DaemonConfig;
use openforge_daemon::service::Services;
use openforge_daemon::store::EventStore;
use openforge_daemon::telemetry::Telemetry;
use openforge_gatepass::HmacSha256Signer;

fn build(dir: &TempDir) -> Services {
    Services {
        store: EventStore::open(dir.path()).expect("open store"),
        signer: Box::new(HmacSha256Signer::new(b"market-secret".to_vec())),
        clock: Box::new(Arc::new(FixedClock::new(1_000))),
        audit: AuditLog::open(dir.path()),
        telemetry: Arc::new(Telemetry::new()),
        cfg: DaemonConfig::default(),
    }
}

fn principal(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        role: Role::Participant,
        token_sha256: format!("hash-{id}"),
    }
}

fn alloc(target: &str, amount: u64) -> AllocationRequest {
    AllocationRequest {
        target_team_id: target.to_string(),
        amount,
    }
}

/// Three teams, one open cluster, each lead holding 1,000,000.
fn seed(services: &Services) {
    services
        .store
        .upsert_cluster(Cluster {
            id: "c1".to_string(),
            name: "Fintech Cluster".to_string(),
            current_stage: ClusterStage::Bidding,
            bidding_open: true,
        })
        .expect("cluster");
    for (team_id, lead) in [("t1", "p1"), ("t2", "p2"), ("t3", "p3")] {
        services
            .store
            .upsert_team(Team {
                id: team_id.to_string(),
                name: format!("Team {team_id}"),
                lead_principal_id: lead.to_string(),
                cluster_id: Some("c1".to_string()),
                balance: 1_000_000,
                total_invested: 0,
                total_received: 0,
                is_finalized: false,
            })
            .expect("team");
        services
            .store
            .upsert_participant(Participant {
                id: lead.to_string(),
                display_name: format!("Lead of {team_id}"),
                college_id: None,
                team_id: Some(team_id.to_string()),
                entity_id: None,
                gate_token: None,
                gate_token_issued_at_ms: None,
                token_floor_ms: None,
            })
            .expect("lead");
    }
}

#[test]
fn full_balance_commit_updates_both_sides_of_the_market() {
    let dir = TempDir::new().expect("tmp");
    let services = build(&dir);
    seed(&services);

    let outcome = services
        .commit_portfolio(
            &principal("p1"),
            &[alloc("t2", 400_000), alloc("t3", 600_000)],
        )
        .expect("commit");
    assert_eq!(outcome.total_invested, 1_000_000);

    let investor = services.store.team("t1").expect("t1");
    assert_eq!(investor.balance, 0);
    assert_eq!(investor.total_invested, 1_000_000);
    assert!(investor.is_finalized);
    assert_eq!(services.store.team("t2").expect("t2").total_received, 400_000);
    assert_eq!(services.store.team("t3").expect("t3").total_received, 600_000);
}

#[test]
fn received_totals_accumulate_across_independent_investors() {
    let dir = TempDir::new().expect("tmp");
    let services = build(&dir);
    seed(&services);

    services
        .commit_portfolio(&principal("p1"), &[alloc("t3", 250_000)])
        .expect("t1 commit");
    services
        .commit_portfolio(&principal("p2"), &[alloc("t3", 100_000)])
        .expect("t2 commit");

    assert_eq!(services.store.team("t3").expect("t3").total_received, 350_000);
    assert!(!services.store.team("t3").expect("t3").is_finalized);
}

#[test]
fn closed_window_blocks_the_market_without_side_effects() {
    let dir = TempDir::new().expect("tmp");
    let services = build(&dir);
    seed(&services);
    services
        .store
        .set_cluster_stage("c1", ClusterStage::Bidding, false)
        .expect("close window");

    let err = services
        .commit_portfolio(&principal("p1"), &[alloc("t2", 400_000)])
        .expect_err("market closed");
    assert_eq!(err, ForgeError::MarketClosed);

    let investor = services.store.team("t1").expect("t1");
    assert_eq!(investor.balance, 1_000_000);
    assert!(!investor.is_finalized);
    assert!(services.store.investments_by_investor("t1").is_empty());
}

#[test]
fn commit_is_at_most_once_under_racing_leads() {
    let dir = TempDir::new().expect("tmp");
    let services = Arc::new(build(&dir));
    seed(&services);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let services = Arc::clone(&services);
            std::thread::spawn(move || {
                services.commit_portfolio(&principal("p1"), &[alloc("t2", 300_000)])
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| *o == &Err(ForgeError::AlreadyFinalized))
            .count(),
        3
    );

    let investor = services.store.team("t1").expect("t1");
    assert_eq!(investor.balance, 700_000, "deducted exactly once");
    assert_eq!(services.store.team("t2").expect("t2").total_received, 300_000);
}

#[test]
fn audit_event_carries_the_full_allocation_list() {
    let dir = TempDir::new().expect("tmp");
    let services = build(&dir);
    seed(&services);

    services
        .commit_portfolio(
            &principal("p1"),
            &[alloc("t2", 400_000), alloc("t3", 600_000)],
        )
        .expect("commit");

    let raw = std::fs::read_to_string(dir.path().join("audit.ndjson")).expect("audit log");
    let event: serde_json::Value = serde_json::from_str(
        raw.lines()
            .find(|line| line.contains("portfolio_committed"))
            .expect("commit event"),
    )
    .expect("event json");
    assert_eq!(event["actor_id"], "p1");
    assert_eq!(event["target_id"], "t1");
    assert_eq!(event["metadata"]["total"], 1_000_000);
    assert_eq!(event["metadata"]["allocations"][0]["target_team_id"], "t2");
    assert_eq!(event["metadata"]["allocations"][1]["amount"], 600_000);
}
