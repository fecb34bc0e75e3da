// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! openforge-core
//!
//! Domain core of the OpenForge event platform:
//! - participant / team / cluster / investment records
//! - the unified error taxonomy exposed to API callers
//! - the portfolio commit engine (validation and planning for the one-shot
//!   investment allocation a team lead performs while its cluster market
//!   is open)
//! - audit event types consumed by the append-only audit log
//!
//! The crate is persistence-free: records are plain serde types and the
//! commit engine plans against snapshots, leaving transactional application
//! to the store that owns the data.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod audit;
pub mod error;
pub mod market;
pub mod model;

pub use error::{ForgeError, ForgeResult};
