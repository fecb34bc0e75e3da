use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::market::CommitPlan;

/// One record in the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub event_type: String,
    pub actor_id: String,
    pub target_id: String,
    pub metadata: Value,
    pub at_ms: u64,
}

impl AuditEvent {
    pub fn participant_onboarded(actor_id: &str, entity_id: &str, at_ms: u64) -> Self {
        Self {
            event_type: "participant_onboarded".to_string(),
            actor_id: actor_id.to_string(),
            target_id: actor_id.to_string(),
            metadata: json!({ "entity_id": entity_id }),
            at_ms,
        }
    }

    pub fn gate_token_issued(actor_id: &str, entity_id: &str, issued_at_ms: u64) -> Self {
        Self {
            event_type: "gate_token_issued".to_string(),
            actor_id: actor_id.to_string(),
            target_id: entity_id.to_string(),
            metadata: json!({ "issued_at_ms": issued_at_ms }),
            at_ms: issued_at_ms,
        }
    }

    pub fn gate_token_revoked(
        actor_id: &str,
        participant_id: &str,
        token_floor_ms: u64,
        at_ms: u64,
    ) -> Self {
        Self {
            event_type: "gate_token_revoked".to_string(),
            actor_id: actor_id.to_string(),
            target_id: participant_id.to_string(),
            metadata: json!({ "token_floor_ms": token_floor_ms }),
            at_ms,
        }
    }

    pub fn portfolio_committed(actor_id: &str, plan: &CommitPlan, at_ms: u64) -> Self {
        let allocations: Vec<Value> = plan
            .entries
            .iter()
            .map(|entry| json!({ "target_team_id": entry.target_team_id, "amount": entry.amount }))
            .collect();
        Self {
            event_type: "portfolio_committed".to_string(),
            actor_id: actor_id.to_string(),
            target_id: plan.investor_team_id.clone(),
            metadata: json!({ "total": plan.total, "allocations": allocations }),
            at_ms,
        }
    }

    pub fn cluster_stage_changed(actor_id: &str, cluster_id: &str, stage: &str, at_ms: u64) -> Self {
        Self {
            event_type: "cluster_stage_changed".to_string(),
            actor_id: actor_id.to_string(),
            target_id: cluster_id.to_string(),
            metadata: json!({ "stage": stage }),
            at_ms,
        }
    }
}
