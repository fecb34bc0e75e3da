// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! openforge-gatepass
//!
//! The signed gate-pass token protocol used for physical event entry.
//!
//! A gate pass is a compact bearer credential displayed as a QR code and
//! verified at the gate with a single shared-secret check plus one record
//! lookup. The wire format is colon-delimited ASCII:
//!
//! ```text
//! {entity_id}:{issued_at_ms}:{hex_lowercase_hmac_sha256}
//! ```
//!
//! where the signature covers the canonical signing material
//! `{entity_id}:{issued_at_ms}`. Verification re-derives validity from the
//! token's own fields; there is no stored-token comparison, so an older
//! token stays valid until it ages out (callers wanting early revocation
//! keep a per-entity issuance watermark next to their records).
//!
//! Signing is an injected capability so deployments can rotate keys or move
//! to hardware-backed signing without touching call sites.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default validity window for an issued gate pass.
pub const DEFAULT_TOKEN_TTL_MS: u64 = 24 * 60 * 60 * 1_000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed gate pass")]
    Malformed,

    #[error("gate pass expired")]
    Expired,

    #[error("gate pass signature mismatch")]
    InvalidSignature,
}

/// Signing capability for gate passes.
///
/// `verify` defaults to a constant-time comparison against a fresh
/// signature; implementations backed by remote keys may override it.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, material: &[u8]) -> Vec<u8>;

    fn verify(&self, material: &[u8], signature: &[u8]) -> bool {
        constant_time_eq(self.sign(material).as_slice(), signature)
    }
}

/// Process-local HMAC-SHA256 signer over a shared secret.
#[derive(Debug, Clone)]
pub struct HmacSha256Signer {
    secret: Vec<u8>,
}

impl HmacSha256Signer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenSigner for HmacSha256Signer {
    fn sign(&self, material: &[u8]) -> Vec<u8> {
        hmac_sha256(&self.secret, material).to_vec()
    }
}

/// Canonical signing material: `{entity_id}:{issued_at_ms}`.
pub fn signing_material(entity_id: &str, issued_at_ms: u64) -> String {
    format!("{entity_id}:{issued_at_ms}")
}

/// Encodes a gate pass for `entity_id` issued at `issued_at_ms`.
///
/// The entity id must be non-empty and colon-free; issuance sites validate
/// that at assignment time, so this function does not re-check it.
pub fn issue(signer: &dyn TokenSigner, entity_id: &str, issued_at_ms: u64) -> String {
    let material = signing_material(entity_id, issued_at_ms);
    let signature = signer.sign(material.as_bytes());
    format!("{entity_id}:{issued_at_ms}:{}", hex::encode(signature))
}

/// Raw fields of a scanned token, split but not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub entity_id: &'a str,
    pub timestamp: &'a str,
    pub signature_hex: &'a str,
}

/// Splits a scanned string into its three fields.
pub fn parse(token: &str) -> Result<TokenParts<'_>, TokenError> {
    let mut fields = token.split(':');
    let (Some(entity_id), Some(timestamp), Some(signature_hex), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(TokenError::Malformed);
    };
    if entity_id.is_empty() || signature_hex.is_empty() {
        return Err(TokenError::Malformed);
    }
    Ok(TokenParts {
        entity_id,
        timestamp,
        signature_hex,
    })
}

/// A token that passed freshness and authenticity checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub entity_id: String,
    pub issued_at_ms: u64,
}

/// Verifies a scanned token string.
///
/// Check order is fixed: parse, freshness, authenticity. An unparseable
/// timestamp reports `Expired` rather than `Malformed` (the field split
/// succeeded; only the freshness claim is unusable). The signature is
/// recomputed over the transmitted timestamp string, not a re-serialized
/// integer, so a token only verifies byte-for-byte as issued. Tokens dated
/// in the future are treated as age zero.
pub fn verify(
    signer: &dyn TokenSigner,
    token: &str,
    now_ms: u64,
    ttl_ms: u64,
) -> Result<VerifiedToken, TokenError> {
    let parts = parse(token)?;

    let issued_at_ms: u64 = parts.timestamp.parse().map_err(|_| TokenError::Expired)?;
    if now_ms.saturating_sub(issued_at_ms) > ttl_ms {
        return Err(TokenError::Expired);
    }

    let provided = hex::decode(parts.signature_hex).map_err(|_| TokenError::InvalidSignature)?;
    let material = format!("{}:{}", parts.entity_id, parts.timestamp);
    if !signer.verify(material.as_bytes(), &provided) {
        return Err(TokenError::InvalidSignature);
    }

    Ok(VerifiedToken {
        entity_id: parts.entity_id.to_string(),
        issued_at_ms,
    })
}

fn hmac_sha256(secret: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK_SIZE: usize = 64;
    let mut key_block = [0u8; BLOCK_SIZE];
    if secret.len() > BLOCK_SIZE {
        let digest = Sha256::digest(secret);
        key_block[..digest.len()].copy_from_slice(&digest);
    } else {
        key_block[..secret.len()].copy_from_slice(secret);
    }

    let mut o_key_pad = [0u8; BLOCK_SIZE];
    let mut i_key_pad = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        o_key_pad[i] = key_block[i] ^ 0x5c;
        i_key_pad[i] = key_block[i] ^ 0x36;
    }

    let mut inner = Sha256::new();
    inner.update(i_key_pad);
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(o_key_pad);
    outer.update(inner_hash);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
