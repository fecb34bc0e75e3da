// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Portfolio commit engine.
//!
//! A team lead distributes the team's investable balance across other teams
//! in its cluster exactly once. This module holds the pure half of that
//! operation: precondition checks and plan construction against a snapshot
//! of the investor team and its cluster. The store applies a plan as a
//! single all-or-nothing unit and owns the at-most-once guarantee (it
//! re-checks finalization under its own lock before writing).
//!
//! Precondition order is part of the contract: a caller holding several
//! violations at once always sees the first one listed in
//! [`plan_commit`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::model::{Cluster, Team};

/// One requested allocation line, as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationRequest {
    pub target_team_id: String,
    pub amount: u64,
}

/// A validated, ready-to-apply investment line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedInvestment {
    pub target_team_id: String,
    pub amount: u64,
}

/// The validated outcome of [`plan_commit`].
///
/// `entries` excludes zero-amount lines (they are no-ops); `total` is the
/// exact amount the store must deduct from the investor's balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitPlan {
    pub investor_team_id: String,
    pub entries: Vec<PlannedInvestment>,
    pub total: u64,
}

/// Validates a requested allocation against a snapshot of the investor
/// team and its cluster.
///
/// Checks, first failure wins:
/// 1. team not yet finalized, else `AlreadyFinalized`
/// 2. team belongs to a cluster that currently accepts bids, else
///    `MarketClosed`
/// 3. allocations non-empty, no self-target, no duplicate target, amounts
///    sum without overflow, else `InvalidAllocation`
/// 4. the sum fits in the team's balance, else `InsufficientBalance`
///
/// The caller-identity check (only the team lead commits) happens before
/// this function, where the principal is known.
pub fn plan_commit(
    team: &Team,
    cluster: Option<&Cluster>,
    allocations: &[AllocationRequest],
) -> ForgeResult<CommitPlan> {
    if team.is_finalized {
        return Err(ForgeError::AlreadyFinalized);
    }

    match cluster {
        Some(cluster) if cluster.accepts_bids() => {}
        _ => return Err(ForgeError::MarketClosed),
    }

    if allocations.is_empty() {
        return Err(ForgeError::InvalidAllocation(
            "allocation list is empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(allocations.len());
    let mut entries = Vec::with_capacity(allocations.len());
    let mut total: u64 = 0;
    for allocation in allocations {
        if allocation.target_team_id == team.id {
            return Err(ForgeError::InvalidAllocation(
                "a team cannot invest in itself".to_string(),
            ));
        }
        if !seen.insert(allocation.target_team_id.as_str()) {
            return Err(ForgeError::InvalidAllocation(format!(
                "duplicate target team {}",
                allocation.target_team_id
            )));
        }
        if allocation.amount == 0 {
            continue;
        }
        total = total
            .checked_add(allocation.amount)
            .ok_or_else(|| ForgeError::InvalidAllocation("amount overflow".to_string()))?;
        entries.push(PlannedInvestment {
            target_team_id: allocation.target_team_id.clone(),
            amount: allocation.amount,
        });
    }

    if total > team.balance {
        return Err(ForgeError::InsufficientBalance);
    }

    Ok(CommitPlan {
        investor_team_id: team.id.clone(),
        entries,
        total,
    })
}
