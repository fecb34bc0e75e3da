use serde::{Deserialize, Serialize};

/// Roles recognized by the API layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Participant,
    GateVerifier,
    CollegeAdmin,
    SuperAdmin,
}

impl Role {
    /// Gate verification is open to gate staff and both admin tiers.
    pub fn may_verify_gate(self) -> bool {
        matches!(
            self,
            Self::GateVerifier | Self::CollegeAdmin | Self::SuperAdmin
        )
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::CollegeAdmin | Self::SuperAdmin)
    }
}

/// An authenticated API caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    /// Lowercase hex SHA-256 of the bearer secret that authenticates
    /// this principal.
    pub token_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub college_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    /// Assigned exactly once at onboarding; immutable afterwards.
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Most recently issued gate pass, stored for display by the owner.
    /// Verification never consults it.
    #[serde(default)]
    pub gate_token: Option<String>,
    #[serde(default)]
    pub gate_token_issued_at_ms: Option<u64>,
    /// Issuance watermark: tokens issued strictly before this instant are
    /// rejected at the gate even if otherwise fresh.
    #[serde(default)]
    pub token_floor_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct College {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub lead_principal_id: String,
    #[serde(default)]
    pub cluster_id: Option<String>,
    pub balance: u64,
    #[serde(default)]
    pub total_invested: u64,
    #[serde(default)]
    pub total_received: u64,
    #[serde(default)]
    pub is_finalized: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStage {
    Onboarding,
    Bidding,
    Closed,
}

impl ClusterStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Bidding => "bidding",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub current_stage: ClusterStage,
    pub bidding_open: bool,
}

impl Cluster {
    /// Investments may only be written while the cluster is in the bidding
    /// stage with the bidding window open.
    pub fn accepts_bids(&self) -> bool {
        self.current_stage == ClusterStage::Bidding && self.bidding_open
    }
}

/// One investment row; at most one per `(investor, target)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Investment {
    pub investor_team_id: String,
    pub target_team_id: String,
    pub amount: u64,
}

/// Validates an entity id at assignment time: non-empty printable ASCII
/// without the token field separator.
pub fn validate_entity_id(entity_id: &str) -> Result<(), &'static str> {
    if entity_id.is_empty() || entity_id.len() > 64 {
        return Err("entity id must be between 1 and 64 chars");
    }
    if !entity_id
        .bytes()
        .all(|b| (0x21..=0x7e).contains(&b) && b != b':')
    {
        return Err("entity id must be printable ASCII without ':'");
    }
    Ok(())
}
