// Copyright (c) 2026 OpenForge Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP API surface.
//!
//! Handlers are thin async shims over synchronous `*_impl` functions that
//! take the raw headers and body; tests exercise the `_impl` layer
//! directly without a listener.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use openforge_core::market::AllocationRequest;
use openforge_core::ForgeError;

use crate::auth::resolve_principal;
use crate::service::{CommitOutcome, IssuedPass, Services, VerificationRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardResponse {
    pub entity_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub participant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub token_floor_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub allocations: Vec<AllocationRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub success: bool,
    pub total_invested: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct HttpErr {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl HttpErr {
    fn from_forge(err: ForgeError) -> Self {
        let status = match err {
            ForgeError::MalformedToken | ForgeError::InvalidAllocation(_) => {
                StatusCode::BAD_REQUEST
            }
            ForgeError::Unauthenticated | ForgeError::Expired | ForgeError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            ForgeError::Forbidden => StatusCode::FORBIDDEN,
            ForgeError::NotFound(_) => StatusCode::NOT_FOUND,
            ForgeError::NotOnboarded => StatusCode::PRECONDITION_FAILED,
            ForgeError::AlreadyFinalized
            | ForgeError::MarketClosed
            | ForgeError::InsufficientBalance => StatusCode::CONFLICT,
            ForgeError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            body: ErrorBody {
                error: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "INVALID_REQUEST".to_string(),
                message: message.to_string(),
            },
        }
    }
}

pub fn router(services: Arc<Services>) -> Router {
    let max_body_bytes = services.cfg.max_body_bytes;
    Router::new()
        .route("/v1/healthz", get(healthz))
        .route("/v1/gatepass/onboard", post(onboard))
        .route("/v1/gatepass/issue", post(issue_pass))
        .route("/v1/gatepass/verify", post(verify_pass))
        .route("/v1/gatepass/revoke", post(revoke_pass))
        .route("/v1/portfolio/commit", post(commit_portfolio))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    services: Arc<Services>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(services))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn onboard(State(services): State<Arc<Services>>, headers: HeaderMap) -> Response {
    respond(onboard_impl(&services, &headers))
}

async fn issue_pass(State(services): State<Arc<Services>>, headers: HeaderMap) -> Response {
    respond(issue_pass_impl(&services, &headers))
}

async fn verify_pass(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    respond(verify_pass_impl(&services, &headers, &body))
}

async fn revoke_pass(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    respond(revoke_pass_impl(&services, &headers, &body))
}

async fn commit_portfolio(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    respond(commit_portfolio_impl(&services, &headers, &body))
}

fn respond<T: Serialize>(outcome: Result<T, HttpErr>) -> Response {
    match outcome {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub fn onboard_impl(services: &Services, headers: &HeaderMap) -> Result<OnboardResponse, HttpErr> {
    let principal =
        resolve_principal(&services.store, headers).map_err(HttpErr::from_forge)?;
    let entity_id = services.onboard(&principal).map_err(HttpErr::from_forge)?;
    Ok(OnboardResponse { entity_id })
}

pub fn issue_pass_impl(services: &Services, headers: &HeaderMap) -> Result<IssuedPass, HttpErr> {
    let principal =
        resolve_principal(&services.store, headers).map_err(HttpErr::from_forge)?;
    services.issue_pass(&principal).map_err(HttpErr::from_forge)
}

pub fn verify_pass_impl(
    services: &Services,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<VerificationRecord, HttpErr> {
    let principal =
        resolve_principal(&services.store, headers).map_err(HttpErr::from_forge)?;
    let request: VerifyRequest =
        serde_json::from_slice(body).map_err(|_| HttpErr::bad_request("invalid JSON body"))?;
    services
        .verify_pass(&principal, &request.token)
        .map_err(HttpErr::from_forge)
}

pub fn revoke_pass_impl(
    services: &Services,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RevokeResponse, HttpErr> {
    let principal =
        resolve_principal(&services.store, headers).map_err(HttpErr::from_forge)?;
    let request: RevokeRequest =
        serde_json::from_slice(body).map_err(|_| HttpErr::bad_request("invalid JSON body"))?;
    let token_floor_ms = services
        .revoke_pass(&principal, &request.participant_id)
        .map_err(HttpErr::from_forge)?;
    Ok(RevokeResponse { token_floor_ms })
}

pub fn commit_portfolio_impl(
    services: &Services,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CommitResponse, HttpErr> {
    let principal =
        resolve_principal(&services.store, headers).map_err(HttpErr::from_forge)?;
    let request: CommitRequest =
        serde_json::from_slice(body).map_err(|_| HttpErr::bad_request("invalid JSON body"))?;
    let CommitOutcome { total_invested } = services
        .commit_portfolio(&principal, &request.allocations)
        .map_err(HttpErr::from_forge)?;
    Ok(CommitResponse {
        success: true,
        total_invested,
    })
}
