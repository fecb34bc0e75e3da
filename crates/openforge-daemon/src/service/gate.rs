use rand::Rng;
use serde::{Deserialize, Serialize};

use openforge_core::audit::AuditEvent;
use openforge_core::model::{validate_entity_id, Principal};
use openforge_gatepass::TokenError;

use super::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedPass {
    pub token: String,
    pub issued_at_ms: u64,
}

/// What the gate screen shows after a successful scan. Affiliation fields
/// are best-effort enrichment and may be null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationRecord {
    pub entity_id: String,
    pub participant_id: String,
    pub display_name: String,
    pub college_name: Option<String>,
    pub team_name: Option<String>,
    pub cluster_name: Option<String>,
    pub issued_at_ms: u64,
    pub verified_at_ms: u64,
}

impl Services {
    /// Assigns the caller's entity id, exactly once. Re-calls return the
    /// existing id.
    pub fn onboard(&self, actor: &Principal) -> ForgeResult<String> {
        let participant = self
            .store
            .participant(&actor.id)
            .ok_or_else(|| ForgeError::NotFound(format!("participant {}", actor.id)))?;
        if let Some(existing) = participant.entity_id {
            return Ok(existing);
        }

        let now = self.clock.now_ms();
        for _ in 0..64 {
            let suffix: u16 = rand::thread_rng().gen();
            let candidate = format!("{}-{suffix:04X}", self.cfg.entity_id_prefix);
            if validate_entity_id(&candidate).is_err() {
                tracing::error!(prefix = %self.cfg.entity_id_prefix, "entity id prefix misconfigured");
                return Err(ForgeError::StoreUnavailable);
            }
            if self.store.participant_by_entity(&candidate).is_some() {
                continue;
            }
            let assigned = self.store.assign_entity_id(&actor.id, &candidate)?;
            self.audit
                .append(&AuditEvent::participant_onboarded(&actor.id, &assigned, now));
            tracing::info!(principal_id = %actor.id, entity_id = %assigned, "participant onboarded");
            return Ok(assigned);
        }
        tracing::error!(prefix = %self.cfg.entity_id_prefix, "entity id space exhausted");
        Err(ForgeError::StoreUnavailable)
    }

    /// Issues a fresh gate pass for the caller and stores it for display.
    ///
    /// Earlier passes stay independently valid until they age out or a
    /// revocation raises the watermark; validity is derived from the token
    /// itself, not from the stored copy.
    pub fn issue_pass(&self, actor: &Principal) -> ForgeResult<IssuedPass> {
        let participant = self
            .store
            .participant(&actor.id)
            .ok_or_else(|| ForgeError::NotFound(format!("participant {}", actor.id)))?;
        let entity_id = participant.entity_id.ok_or(ForgeError::NotOnboarded)?;

        let issued_at_ms = self.clock.now_ms();
        let token = openforge_gatepass::issue(self.signer.as_ref(), &entity_id, issued_at_ms);
        self.store
            .record_issued_token(&actor.id, &token, issued_at_ms)?;

        self.audit
            .append(&AuditEvent::gate_token_issued(&actor.id, &entity_id, issued_at_ms));
        self.telemetry.record_token_issued();
        tracing::info!(principal_id = %actor.id, entity_id = %entity_id, "gate pass issued");
        Ok(IssuedPass {
            token,
            issued_at_ms,
        })
    }

    /// Verifies a scanned pass. Read-only: performs no store writes.
    pub fn verify_pass(&self, actor: &Principal, raw: &str) -> ForgeResult<VerificationRecord> {
        let outcome = self.verify_pass_inner(actor, raw);
        match &outcome {
            Ok(record) => {
                self.telemetry.record_gate_verify("ok");
                tracing::info!(
                    verifier = %actor.id,
                    entity_id = %record.entity_id,
                    "gate pass accepted"
                );
            }
            Err(err) => {
                self.telemetry.record_gate_verify(err.code());
                tracing::info!(verifier = %actor.id, reason = %err.code(), "gate pass rejected");
            }
        }
        outcome
    }

    fn verify_pass_inner(&self, actor: &Principal, raw: &str) -> ForgeResult<VerificationRecord> {
        if !actor.role.may_verify_gate() {
            return Err(ForgeError::Forbidden);
        }

        let now = self.clock.now_ms();
        let verified =
            openforge_gatepass::verify(self.signer.as_ref(), raw, now, self.cfg.token_ttl_ms)
                .map_err(|err| match err {
                    TokenError::Malformed => ForgeError::MalformedToken,
                    TokenError::Expired => ForgeError::Expired,
                    TokenError::InvalidSignature => ForgeError::InvalidSignature,
                })?;

        let participant = self
            .store
            .participant_by_entity(&verified.entity_id)
            .ok_or_else(|| ForgeError::NotFound(format!("entity {}", verified.entity_id)))?;

        // Revocation watermark: passes issued before the floor are dead
        // even when otherwise fresh.
        if let Some(floor) = participant.token_floor_ms {
            if verified.issued_at_ms < floor {
                return Err(ForgeError::Expired);
            }
        }

        let college_name = participant
            .college_id
            .as_deref()
            .and_then(|id| self.store.college(id))
            .map(|college| college.name);
        let team = participant
            .team_id
            .as_deref()
            .and_then(|id| self.store.team(id));
        let cluster_name = team
            .as_ref()
            .and_then(|team| team.cluster_id.as_deref())
            .and_then(|id| self.store.cluster(id))
            .map(|cluster| cluster.name);

        Ok(VerificationRecord {
            entity_id: verified.entity_id,
            participant_id: participant.id,
            display_name: participant.display_name,
            college_name,
            team_name: team.map(|team| team.name),
            cluster_name,
            issued_at_ms: verified.issued_at_ms,
            verified_at_ms: now,
        })
    }

    /// Raises the participant's issuance watermark so every pass issued so
    /// far stops verifying. Admin-only.
    pub fn revoke_pass(&self, actor: &Principal, participant_id: &str) -> ForgeResult<u64> {
        if !actor.role.is_admin() {
            return Err(ForgeError::Forbidden);
        }
        let now = self.clock.now_ms();
        let floor = self.store.set_token_floor(participant_id, now)?;
        self.audit.append(&AuditEvent::gate_token_revoked(
            &actor.id,
            participant_id,
            floor,
            now,
        ));
        tracing::info!(
            actor_id = %actor.id,
            participant_id = %participant_id,
            token_floor_ms = floor,
            "gate passes revoked"
        );
        Ok(floor)
    }
}
