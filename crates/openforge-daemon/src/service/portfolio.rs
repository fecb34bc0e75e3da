use serde::{Deserialize, Serialize};

use openforge_core::audit::AuditEvent;
use openforge_core::market::AllocationRequest;
use openforge_core::model::Principal;

use super::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitOutcome {
    pub total_invested: u64,
}

impl Services {
    /// One-shot portfolio commit for the caller's team.
    ///
    /// Validation and application happen inside the store's critical
    /// section (see `EventStore::commit_portfolio`); this layer adds the
    /// audit record and counters around the outcome.
    pub fn commit_portfolio(
        &self,
        actor: &Principal,
        allocations: &[AllocationRequest],
    ) -> ForgeResult<CommitOutcome> {
        match self.store.commit_portfolio(actor, allocations) {
            Ok(plan) => {
                let at_ms = self.clock.now_ms();
                self.audit
                    .append(&AuditEvent::portfolio_committed(&actor.id, &plan, at_ms));
                self.telemetry.record_commit(plan.total);
                tracing::info!(
                    principal_id = %actor.id,
                    team_id = %plan.investor_team_id,
                    total = plan.total,
                    "portfolio committed"
                );
                Ok(CommitOutcome {
                    total_invested: plan.total,
                })
            }
            Err(err) => {
                self.telemetry.record_commit_reject(err.code());
                tracing::info!(
                    principal_id = %actor.id,
                    reason = %err.code(),
                    "portfolio commit rejected"
                );
                Err(err)
            }
        }
    }
}
