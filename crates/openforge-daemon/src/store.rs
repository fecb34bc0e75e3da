// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! File-backed event store.
//!
//! All platform records live in one JSON state file under the data
//! directory. Mutations run under a single process-wide mutex and persist
//! with atomic-durable semantics (temp file, fsync, rename, directory
//! fsync); a failed persist rolls the in-memory state back to the
//! pre-mutation snapshot, so every mutation is all-or-nothing.
//!
//! The portfolio commit runs validation and application inside one
//! critical section: the finalization flag is re-read under the lock, which
//! is what makes a commit at-most-once when two requests race, and target
//! aggregates are recomputed in the same section so concurrent commits
//! toward a shared target cannot lose updates.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use openforge_core::market::{plan_commit, AllocationRequest, CommitPlan};
use openforge_core::model::{
    Cluster, ClusterStage, College, Investment, Participant, Principal, Team,
};
use openforge_core::{ForgeError, ForgeResult};

const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateFile {
    principals: HashMap<String, Principal>,
    participants: HashMap<String, Participant>,
    colleges: HashMap<String, College>,
    teams: HashMap<String, Team>,
    clusters: HashMap<String, Cluster>,
    investments: Vec<Investment>,
}

#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    state: Mutex<StateFile>,
}

impl EventStore {
    /// Opens the store in `data_dir`, loading existing state if present.
    ///
    /// Load errors are fail-closed: a store that exists but cannot be
    /// decoded refuses to open rather than silently starting empty.
    pub fn open(data_dir: &Path) -> ForgeResult<Self> {
        let path = data_dir.join(STATE_FILE);
        let state = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|err| {
                tracing::error!(error = %err, path = %path.display(), "state read failed");
                ForgeError::StoreUnavailable
            })?;
            serde_json::from_slice(&bytes).map_err(|err| {
                tracing::error!(error = %err, path = %path.display(), "state decode failed");
                ForgeError::StoreUnavailable
            })?
        } else {
            StateFile::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Runs `op` and persists the result as one all-or-nothing unit.
    fn mutate<T>(&self, op: impl FnOnce(&mut StateFile) -> ForgeResult<T>) -> ForgeResult<T> {
        let mut state = self.state.lock();
        let snapshot = state.clone();
        let outcome = op(&mut state).and_then(|out| {
            persist(&self.path, &state)?;
            Ok(out)
        });
        if outcome.is_err() {
            *state = snapshot;
        }
        outcome
    }

    pub fn principal_by_token_hash(&self, token_sha256: &str) -> Option<Principal> {
        self.state
            .lock()
            .principals
            .values()
            .find(|principal| principal.token_sha256 == token_sha256)
            .cloned()
    }

    pub fn participant(&self, id: &str) -> Option<Participant> {
        self.state.lock().participants.get(id).cloned()
    }

    pub fn participant_by_entity(&self, entity_id: &str) -> Option<Participant> {
        self.state
            .lock()
            .participants
            .values()
            .find(|participant| participant.entity_id.as_deref() == Some(entity_id))
            .cloned()
    }

    pub fn college(&self, id: &str) -> Option<College> {
        self.state.lock().colleges.get(id).cloned()
    }

    pub fn team(&self, id: &str) -> Option<Team> {
        self.state.lock().teams.get(id).cloned()
    }

    pub fn cluster(&self, id: &str) -> Option<Cluster> {
        self.state.lock().clusters.get(id).cloned()
    }

    pub fn teams(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.state.lock().teams.values().cloned().collect();
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        teams
    }

    pub fn investments_by_investor(&self, team_id: &str) -> Vec<Investment> {
        self.state
            .lock()
            .investments
            .iter()
            .filter(|investment| investment.investor_team_id == team_id)
            .cloned()
            .collect()
    }

    pub fn upsert_principal(&self, principal: Principal) -> ForgeResult<()> {
        self.mutate(|state| {
            state.principals.insert(principal.id.clone(), principal);
            Ok(())
        })
    }

    pub fn upsert_participant(&self, participant: Participant) -> ForgeResult<()> {
        self.mutate(|state| {
            state
                .participants
                .insert(participant.id.clone(), participant);
            Ok(())
        })
    }

    pub fn upsert_college(&self, college: College) -> ForgeResult<()> {
        self.mutate(|state| {
            state.colleges.insert(college.id.clone(), college);
            Ok(())
        })
    }

    pub fn upsert_team(&self, team: Team) -> ForgeResult<()> {
        self.mutate(|state| {
            state.teams.insert(team.id.clone(), team);
            Ok(())
        })
    }

    pub fn upsert_cluster(&self, cluster: Cluster) -> ForgeResult<()> {
        self.mutate(|state| {
            state.clusters.insert(cluster.id.clone(), cluster);
            Ok(())
        })
    }

    pub fn set_cluster_stage(
        &self,
        cluster_id: &str,
        stage: ClusterStage,
        bidding_open: bool,
    ) -> ForgeResult<()> {
        self.mutate(|state| {
            let cluster = state
                .clusters
                .get_mut(cluster_id)
                .ok_or_else(|| ForgeError::NotFound(format!("cluster {cluster_id}")))?;
            cluster.current_stage = stage;
            cluster.bidding_open = bidding_open;
            Ok(())
        })
    }

    pub fn assign_team_cluster(&self, team_id: &str, cluster_id: &str) -> ForgeResult<()> {
        self.mutate(|state| {
            if !state.clusters.contains_key(cluster_id) {
                return Err(ForgeError::NotFound(format!("cluster {cluster_id}")));
            }
            let team = state
                .teams
                .get_mut(team_id)
                .ok_or_else(|| ForgeError::NotFound(format!("team {team_id}")))?;
            team.cluster_id = Some(cluster_id.to_string());
            Ok(())
        })
    }

    /// Assigns an entity id if the participant does not have one yet;
    /// returns the effective id either way.
    pub fn assign_entity_id(&self, participant_id: &str, entity_id: &str) -> ForgeResult<String> {
        self.mutate(|state| {
            let participant = state
                .participants
                .get_mut(participant_id)
                .ok_or_else(|| ForgeError::NotFound(format!("participant {participant_id}")))?;
            if let Some(existing) = &participant.entity_id {
                return Ok(existing.clone());
            }
            participant.entity_id = Some(entity_id.to_string());
            Ok(entity_id.to_string())
        })
    }

    pub fn record_issued_token(
        &self,
        participant_id: &str,
        token: &str,
        issued_at_ms: u64,
    ) -> ForgeResult<()> {
        self.mutate(|state| {
            let participant = state
                .participants
                .get_mut(participant_id)
                .ok_or_else(|| ForgeError::NotFound(format!("participant {participant_id}")))?;
            participant.gate_token = Some(token.to_string());
            participant.gate_token_issued_at_ms = Some(issued_at_ms);
            Ok(())
        })
    }

    pub fn set_token_floor(&self, participant_id: &str, floor_ms: u64) -> ForgeResult<u64> {
        self.mutate(|state| {
            let participant = state
                .participants
                .get_mut(participant_id)
                .ok_or_else(|| ForgeError::NotFound(format!("participant {participant_id}")))?;
            participant.token_floor_ms = Some(floor_ms);
            Ok(floor_ms)
        })
    }

    /// Validates and applies a portfolio commit as one unit.
    ///
    /// Everything happens under the store lock: the lead check, the plan
    /// (which re-reads `is_finalized`), the investment upserts, the target
    /// aggregate recomputation, and the finalizing balance transfer. A
    /// racing second commit for the same team therefore observes the
    /// finalized flag and fails with `AlreadyFinalized`.
    pub fn commit_portfolio(
        &self,
        principal: &Principal,
        allocations: &[AllocationRequest],
    ) -> ForgeResult<CommitPlan> {
        self.mutate(|state| {
            let participant = state
                .participants
                .get(&principal.id)
                .ok_or_else(|| ForgeError::NotFound(format!("participant {}", principal.id)))?;
            let team_id = participant
                .team_id
                .clone()
                .ok_or_else(|| ForgeError::NotFound("team membership".to_string()))?;
            let team = state
                .teams
                .get(&team_id)
                .cloned()
                .ok_or_else(|| ForgeError::NotFound(format!("team {team_id}")))?;
            if team.lead_principal_id != principal.id {
                return Err(ForgeError::Forbidden);
            }

            let cluster = team
                .cluster_id
                .as_ref()
                .and_then(|id| state.clusters.get(id))
                .cloned();
            let plan = plan_commit(&team, cluster.as_ref(), allocations)?;

            for entry in &plan.entries {
                let target = state.teams.get(&entry.target_team_id).ok_or_else(|| {
                    ForgeError::InvalidAllocation(format!(
                        "unknown target team {}",
                        entry.target_team_id
                    ))
                })?;
                if target.cluster_id != team.cluster_id {
                    return Err(ForgeError::InvalidAllocation(format!(
                        "target team {} is outside the cluster",
                        entry.target_team_id
                    )));
                }
            }

            for entry in &plan.entries {
                let existing = state.investments.iter_mut().find(|investment| {
                    investment.investor_team_id == team_id
                        && investment.target_team_id == entry.target_team_id
                });
                match existing {
                    Some(row) => row.amount = entry.amount,
                    None => state.investments.push(Investment {
                        investor_team_id: team_id.clone(),
                        target_team_id: entry.target_team_id.clone(),
                        amount: entry.amount,
                    }),
                }
            }

            // Derived aggregate: recomputed from the rows rather than
            // incremented, so replaced amounts cannot drift it.
            for entry in &plan.entries {
                let received = state
                    .investments
                    .iter()
                    .filter(|investment| investment.target_team_id == entry.target_team_id)
                    .fold(0u64, |acc, investment| acc.saturating_add(investment.amount));
                if let Some(target) = state.teams.get_mut(&entry.target_team_id) {
                    target.total_received = received;
                }
            }

            let team = state
                .teams
                .get_mut(&team_id)
                .ok_or_else(|| ForgeError::NotFound(format!("team {team_id}")))?;
            team.balance = team.balance.saturating_sub(plan.total);
            team.total_invested = team.total_invested.saturating_add(plan.total);
            team.is_finalized = true;

            Ok(plan)
        })
    }
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> ForgeResult<()> {
    let dir = File::open(path).map_err(|_| ForgeError::StoreUnavailable)?;
    dir.sync_all().map_err(|_| ForgeError::StoreUnavailable)
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> ForgeResult<()> {
    Ok(())
}

fn persist(path: &Path, state: &StateFile) -> ForgeResult<()> {
    let payload = serde_json::to_vec_pretty(state).map_err(|err| {
        tracing::error!(error = %err, "state encode failed");
        ForgeError::StoreUnavailable
    })?;
    let parent = path.parent().ok_or(ForgeError::StoreUnavailable)?;
    let tmp = path.with_extension("tmp");
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();
    if let Err(err) = result {
        tracing::warn!(error = %err, path = %path.display(), "state persist failed");
        return Err(ForgeError::StoreUnavailable);
    }
    sync_directory(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openforge_core::model::Role;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn principal(id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            role: Role::Participant,
            token_sha256: format!("hash-{id}"),
        }
    }

    fn participant_in_team(id: &str, team_id: &str) -> Participant {
        Participant {
            id: id.to_string(),
            display_name: format!("Member {id}"),
            college_id: None,
            team_id: Some(team_id.to_string()),
            entity_id: None,
            gate_token: None,
            gate_token_issued_at_ms: None,
            token_floor_ms: None,
        }
    }

    fn team(id: &str, lead: &str, balance: u64) -> Team {
        Team {
            id: id.to_string(),
            name: format!("Team {id}"),
            lead_principal_id: lead.to_string(),
            cluster_id: Some("c1".to_string()),
            balance,
            total_invested: 0,
            total_received: 0,
            is_finalized: false,
        }
    }

    fn open_cluster() -> Cluster {
        Cluster {
            id: "c1".to_string(),
            name: "Cluster One".to_string(),
            current_stage: ClusterStage::Bidding,
            bidding_open: true,
        }
    }

    fn seeded_store(dir: &TempDir) -> EventStore {
        let store = EventStore::open(dir.path()).expect("open");
        store.upsert_cluster(open_cluster()).expect("cluster");
        store.upsert_team(team("t1", "p1", 1_000_000)).expect("t1");
        store.upsert_team(team("t2", "p2", 1_000_000)).expect("t2");
        store.upsert_team(team("t3", "p3", 1_000_000)).expect("t3");
        store
            .upsert_participant(participant_in_team("p1", "t1"))
            .expect("p1");
        store
            .upsert_participant(participant_in_team("p2", "t2"))
            .expect("p2");
        store
    }

    fn alloc(target: &str, amount: u64) -> AllocationRequest {
        AllocationRequest {
            target_team_id: target.to_string(),
            amount,
        }
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().expect("tmp");
        {
            let store = seeded_store(&dir);
            store
                .record_issued_token("p1", "OF-2026-A7F3:1:aa", 1)
                .expect("token");
        }
        let store = EventStore::open(dir.path()).expect("reopen");
        let participant = store.participant("p1").expect("p1");
        assert_eq!(participant.gate_token.as_deref(), Some("OF-2026-A7F3:1:aa"));
    }

    #[test]
    fn commit_transfers_balance_and_finalizes() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);

        let plan = store
            .commit_portfolio(
                &principal("p1"),
                &[alloc("t2", 400_000), alloc("t3", 600_000)],
            )
            .expect("commit");
        assert_eq!(plan.total, 1_000_000);

        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 0);
        assert_eq!(investor.total_invested, 1_000_000);
        assert!(investor.is_finalized);
        assert_eq!(store.team("t2").expect("t2").total_received, 400_000);
        assert_eq!(store.team("t3").expect("t3").total_received, 600_000);

        let outbound = store.investments_by_investor("t1");
        let invested: u64 = outbound.iter().map(|investment| investment.amount).sum();
        assert_eq!(invested, 1_000_000);
    }

    #[test]
    fn second_commit_is_rejected_and_a_noop() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);
        store
            .commit_portfolio(&principal("p1"), &[alloc("t2", 100)])
            .expect("first");

        let err = store
            .commit_portfolio(&principal("p1"), &[alloc("t3", 100)])
            .expect_err("second");
        assert_eq!(err, ForgeError::AlreadyFinalized);
        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 999_900);
        assert_eq!(store.team("t3").expect("t3").total_received, 0);
    }

    #[test]
    fn non_lead_member_is_forbidden() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);
        store
            .upsert_participant(participant_in_team("p9", "t1"))
            .expect("p9");

        let err = store
            .commit_portfolio(&principal("p9"), &[alloc("t2", 100)])
            .expect_err("not the lead");
        assert_eq!(err, ForgeError::Forbidden);
    }

    #[test]
    fn closed_market_leaves_state_untouched() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);
        store
            .set_cluster_stage("c1", ClusterStage::Bidding, false)
            .expect("close window");

        let err = store
            .commit_portfolio(&principal("p1"), &[alloc("t2", 100)])
            .expect_err("closed");
        assert_eq!(err, ForgeError::MarketClosed);
        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 1_000_000);
        assert!(!investor.is_finalized);
        assert!(store.investments_by_investor("t1").is_empty());
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);

        let err = store
            .commit_portfolio(&principal("p1"), &[alloc("t2", 1_000_001)])
            .expect_err("over balance");
        assert_eq!(err, ForgeError::InsufficientBalance);
        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 1_000_000);
        assert!(!investor.is_finalized);
    }

    #[test]
    fn target_outside_cluster_is_invalid() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);
        let mut lone = team("t9", "p9", 0);
        lone.cluster_id = None;
        store.upsert_team(lone).expect("t9");

        let err = store
            .commit_portfolio(&principal("p1"), &[alloc("t9", 100)])
            .expect_err("outside cluster");
        assert!(matches!(err, ForgeError::InvalidAllocation(_)));
    }

    #[test]
    fn failed_persist_rolls_back_commit() {
        let dir = TempDir::new().expect("tmp");
        let store = seeded_store(&dir);
        let on_disk_before = std::fs::read(dir.path().join(STATE_FILE)).expect("state");

        // Block the temp file path so the atomic write cannot start.
        std::fs::create_dir(dir.path().join("state.tmp")).expect("block tmp");

        let err = store
            .commit_portfolio(&principal("p1"), &[alloc("t2", 100)])
            .expect_err("persist blocked");
        assert_eq!(err, ForgeError::StoreUnavailable);

        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 1_000_000);
        assert!(!investor.is_finalized);
        assert!(store.investments_by_investor("t1").is_empty());
        assert_eq!(
            std::fs::read(dir.path().join(STATE_FILE)).expect("state"),
            on_disk_before,
            "on-disk state must be untouched"
        );
    }

    #[test]
    fn racing_commits_produce_exactly_one_success() {
        let dir = TempDir::new().expect("tmp");
        let store = Arc::new(seeded_store(&dir));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.commit_portfolio(&principal("p1"), &[alloc("t2", 250_000)])
                })
            })
            .collect();
        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect();

        let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(successes, 1, "exactly one commit may win");
        assert!(outcomes
            .iter()
            .any(|outcome| outcome == &Err(ForgeError::AlreadyFinalized)));

        let investor = store.team("t1").expect("t1");
        assert_eq!(investor.balance, 750_000, "balance deducted exactly once");
        assert_eq!(store.team("t2").expect("t2").total_received, 250_000);
    }
}
