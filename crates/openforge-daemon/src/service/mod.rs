// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Platform services: gate access, portfolio market, administration.
//!
//! One `Services` value owns the store, the token signer, the clock, the
//! audit log and telemetry; operation groups live in sibling modules as
//! additional `impl` blocks.

use std::path::Path;
use std::sync::Arc;

use openforge_core::{ForgeError, ForgeResult};
use openforge_gatepass::{HmacSha256Signer, TokenSigner};

use crate::audit::AuditLog;
use crate::clock::{Clock, SystemClock};
use crate::config::DaemonConfig;
use crate::store::EventStore;
use crate::telemetry::Telemetry;

mod admin;
mod gate;
mod portfolio;

pub use gate::{IssuedPass, VerificationRecord};
pub use portfolio::CommitOutcome;

pub struct Services {
    pub store: EventStore,
    pub signer: Box<dyn TokenSigner>,
    pub clock: Box<dyn Clock>,
    pub audit: AuditLog,
    pub telemetry: Arc<Telemetry>,
    pub cfg: DaemonConfig,
}

impl Services {
    /// Builds the production wiring over `data_dir`.
    pub fn build(
        data_dir: &Path,
        gate_secret: impl Into<Vec<u8>>,
        cfg: DaemonConfig,
    ) -> ForgeResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|err| {
            tracing::error!(error = %err, path = %data_dir.display(), "data dir create failed");
            ForgeError::StoreUnavailable
        })?;
        Ok(Self {
            store: EventStore::open(data_dir)?,
            signer: Box::new(HmacSha256Signer::new(gate_secret)),
            clock: Box::new(SystemClock),
            audit: AuditLog::open(data_dir),
            telemetry: Arc::new(Telemetry::new()),
            cfg,
        })
    }
}
