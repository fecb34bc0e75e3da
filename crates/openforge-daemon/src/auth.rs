use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use openforge_core::model::Principal;
use openforge_core::{ForgeError, ForgeResult};

use crate::store::EventStore;

/// Hex SHA-256 of a bearer secret, as stored on principal records.
pub fn token_sha256(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Resolves the caller from the `Authorization: Bearer` header.
///
/// Missing, unreadable, or unknown credentials all collapse to
/// `Unauthenticated`; the caller learns nothing about which check failed.
pub fn resolve_principal(store: &EventStore, headers: &HeaderMap) -> ForgeResult<Principal> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Err(ForgeError::Unauthenticated);
    };
    let Ok(header) = header.to_str() else {
        return Err(ForgeError::Unauthenticated);
    };
    let Some(secret) = header.strip_prefix("Bearer ") else {
        return Err(ForgeError::Unauthenticated);
    };
    store
        .principal_by_token_hash(&token_sha256(secret))
        .ok_or(ForgeError::Unauthenticated)
}
