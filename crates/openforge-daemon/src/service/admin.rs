use openforge_core::audit::AuditEvent;
use openforge_core::model::{Cluster, ClusterStage, College, Participant, Principal, Team};

use super::*;

/// Thin admin CRUD over the store. Role checks only; the records carry no
/// invariants beyond referential existence, which the store enforces.
impl Services {
    fn require_admin(actor: &Principal) -> ForgeResult<()> {
        if actor.role.is_admin() {
            Ok(())
        } else {
            Err(ForgeError::Forbidden)
        }
    }

    pub fn register_principal(&self, actor: &Principal, principal: Principal) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.upsert_principal(principal)
    }

    pub fn register_participant(
        &self,
        actor: &Principal,
        participant: Participant,
    ) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.upsert_participant(participant)
    }

    pub fn create_college(&self, actor: &Principal, college: College) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.upsert_college(college)
    }

    pub fn create_team(&self, actor: &Principal, team: Team) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.upsert_team(team)
    }

    pub fn create_cluster(&self, actor: &Principal, cluster: Cluster) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.upsert_cluster(cluster)
    }

    pub fn assign_team_cluster(
        &self,
        actor: &Principal,
        team_id: &str,
        cluster_id: &str,
    ) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.assign_team_cluster(team_id, cluster_id)
    }

    pub fn set_cluster_stage(
        &self,
        actor: &Principal,
        cluster_id: &str,
        stage: ClusterStage,
        bidding_open: bool,
    ) -> ForgeResult<()> {
        Self::require_admin(actor)?;
        self.store.set_cluster_stage(cluster_id, stage, bidding_open)?;
        self.audit.append(&AuditEvent::cluster_stage_changed(
            &actor.id,
            cluster_id,
            stage.as_str(),
            self.clock.now_ms(),
        ));
        tracing::info!(
            actor_id = %actor.id,
            cluster_id = %cluster_id,
            stage = stage.as_str(),
            bidding_open,
            "cluster stage changed"
        );
        Ok(())
    }
}
