// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator CLI working directly against an OpenForge data directory.
//!
//! Administrative records (principals, colleges, teams, clusters) are
//! seeded here rather than over the HTTP API; participant-facing flows
//! (onboard, issue, verify, commit) are available too for offline
//! operation and smoke-testing an event setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use openforge_core::market::AllocationRequest;
use openforge_core::model::{Cluster, ClusterStage, College, Participant, Principal, Role, Team};
use openforge_daemon::auth::token_sha256;
use openforge_daemon::config::DaemonConfig;
use openforge_daemon::service::Services;

#[derive(Parser)]
#[command(name = "openforgectl")]
#[command(about = "OpenForge platform operator tool")]
struct Cli {
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    Principal {
        #[command(subcommand)]
        cmd: PrincipalCmd,
    },
    Participant {
        #[command(subcommand)]
        cmd: ParticipantCmd,
    },
    College {
        #[command(subcommand)]
        cmd: CollegeCmd,
    },
    Team {
        #[command(subcommand)]
        cmd: TeamCmd,
    },
    Cluster {
        #[command(subcommand)]
        cmd: ClusterCmd,
    },
    Gatepass {
        #[command(subcommand)]
        cmd: GatepassCmd,
    },
    Portfolio {
        #[command(subcommand)]
        cmd: PortfolioCmd,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Participant,
    GateVerifier,
    CollegeAdmin,
    SuperAdmin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Participant => Role::Participant,
            RoleArg::GateVerifier => Role::GateVerifier,
            RoleArg::CollegeAdmin => Role::CollegeAdmin,
            RoleArg::SuperAdmin => Role::SuperAdmin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Onboarding,
    Bidding,
    Closed,
}

impl From<StageArg> for ClusterStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Onboarding => ClusterStage::Onboarding,
            StageArg::Bidding => ClusterStage::Bidding,
            StageArg::Closed => ClusterStage::Closed,
        }
    }
}

#[derive(Subcommand)]
enum PrincipalCmd {
    /// Register an API principal authenticated by a bearer secret.
    Register {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        secret: String,
    },
}

#[derive(Subcommand)]
enum ParticipantCmd {
    Register {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        college: Option<String>,
        #[arg(long)]
        team: Option<String>,
    },
    /// Assign the participant's entity id (idempotent).
    Onboard {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum CollegeCmd {
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum TeamCmd {
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        lead: String,
        #[arg(long)]
        balance: u64,
        #[arg(long)]
        cluster: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum ClusterCmd {
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Move a cluster through its market stages.
    SetStage {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        stage: StageArg,
        #[arg(long)]
        open: bool,
    },
    Assign {
        #[arg(long)]
        team: String,
        #[arg(long)]
        cluster: String,
    },
}

#[derive(Subcommand)]
enum GatepassCmd {
    /// Issue a gate pass for a participant.
    Issue {
        #[arg(long)]
        participant: String,
    },
    /// Verify a scanned token string.
    Verify {
        #[arg(long)]
        token: String,
    },
    /// Invalidate every pass issued to the participant so far.
    Revoke {
        #[arg(long)]
        participant: String,
    },
}

#[derive(Subcommand)]
enum PortfolioCmd {
    /// Commit a team's allocation on behalf of its lead.
    Commit {
        #[arg(long)]
        lead: String,
        /// Allocation lines, `target-team=amount`, repeatable.
        #[arg(long = "alloc")]
        allocations: Vec<String>,
    },
}

fn operator() -> Principal {
    Principal {
        id: "openforgectl".to_string(),
        role: Role::SuperAdmin,
        token_sha256: String::new(),
    }
}

fn acting_participant(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        role: Role::Participant,
        token_sha256: String::new(),
    }
}

fn parse_allocations(raw: &[String]) -> Result<Vec<AllocationRequest>, String> {
    raw.iter()
        .map(|line| {
            let (target, amount) = line
                .split_once('=')
                .ok_or_else(|| format!("allocation {line:?} must be target-team=amount"))?;
            let amount: u64 = amount
                .parse()
                .map_err(|_| format!("allocation amount in {line:?} must be a whole number"))?;
            Ok(AllocationRequest {
                target_team_id: target.to_string(),
                amount,
            })
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let gate_secret = std::env::var("OPENFORGE_GATE_SECRET")
        .map_err(|_| "OPENFORGE_GATE_SECRET must be set")?;
    let services = Services::build(&cli.data_dir, gate_secret.into_bytes(), DaemonConfig::from_env())?;
    let admin = operator();

    match cli.cmd {
        Command::Principal { cmd } => match cmd {
            PrincipalCmd::Register { id, role, secret } => {
                services.register_principal(
                    &admin,
                    Principal {
                        id: id.clone(),
                        role: role.into(),
                        token_sha256: token_sha256(&secret),
                    },
                )?;
                println!("{}", json!({ "registered": id }));
            }
        },
        Command::Participant { cmd } => match cmd {
            ParticipantCmd::Register {
                id,
                name,
                college,
                team,
            } => {
                services.register_participant(
                    &admin,
                    Participant {
                        id: id.clone(),
                        display_name: name,
                        college_id: college,
                        team_id: team,
                        entity_id: None,
                        gate_token: None,
                        gate_token_issued_at_ms: None,
                        token_floor_ms: None,
                    },
                )?;
                println!("{}", json!({ "registered": id }));
            }
            ParticipantCmd::Onboard { id } => {
                let entity_id = services.onboard(&acting_participant(&id))?;
                println!("{}", json!({ "participant": id, "entity_id": entity_id }));
            }
        },
        Command::College { cmd } => match cmd {
            CollegeCmd::Create { id, name } => {
                services.create_college(&admin, College { id: id.clone(), name })?;
                println!("{}", json!({ "created": id }));
            }
        },
        Command::Team { cmd } => match cmd {
            TeamCmd::Create {
                id,
                name,
                lead,
                balance,
                cluster,
            } => {
                services.create_team(
                    &admin,
                    Team {
                        id: id.clone(),
                        name,
                        lead_principal_id: lead,
                        cluster_id: cluster,
                        balance,
                        total_invested: 0,
                        total_received: 0,
                        is_finalized: false,
                    },
                )?;
                println!("{}", json!({ "created": id }));
            }
            TeamCmd::List => {
                let teams = services.store.teams();
                println!("{}", serde_json::to_string_pretty(&teams)?);
            }
        },
        Command::Cluster { cmd } => match cmd {
            ClusterCmd::Create { id, name } => {
                services.create_cluster(
                    &admin,
                    Cluster {
                        id: id.clone(),
                        name,
                        current_stage: ClusterStage::Onboarding,
                        bidding_open: false,
                    },
                )?;
                println!("{}", json!({ "created": id }));
            }
            ClusterCmd::SetStage { id, stage, open } => {
                let stage: ClusterStage = stage.into();
                services.set_cluster_stage(&admin, &id, stage, open)?;
                println!(
                    "{}",
                    json!({ "cluster": id, "stage": stage.as_str(), "bidding_open": open })
                );
            }
            ClusterCmd::Assign { team, cluster } => {
                services.assign_team_cluster(&admin, &team, &cluster)?;
                println!("{}", json!({ "team": team, "cluster": cluster }));
            }
        },
        Command::Gatepass { cmd } => match cmd {
            GatepassCmd::Issue { participant } => {
                let pass = services.issue_pass(&acting_participant(&participant))?;
                println!("{}", serde_json::to_string_pretty(&pass)?);
            }
            GatepassCmd::Verify { token } => {
                let verifier = Principal {
                    id: "openforgectl".to_string(),
                    role: Role::GateVerifier,
                    token_sha256: String::new(),
                };
                match services.verify_pass(&verifier, &token) {
                    Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                    Err(err) => {
                        println!("{}", json!({ "valid": false, "error": err.code() }));
                        std::process::exit(1);
                    }
                }
            }
            GatepassCmd::Revoke { participant } => {
                let floor = services.revoke_pass(&admin, &participant)?;
                println!(
                    "{}",
                    json!({ "participant": participant, "token_floor_ms": floor })
                );
            }
        },
        Command::Portfolio { cmd } => match cmd {
            PortfolioCmd::Commit { lead, allocations } => {
                let allocations = parse_allocations(&allocations)?;
                let outcome =
                    services.commit_portfolio(&acting_participant(&lead), &allocations)?;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
        },
    }

    Ok(())
}
