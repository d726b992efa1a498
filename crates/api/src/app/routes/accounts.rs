//! Account management: registration and status changes.
//!
//! Mounted behind the `admin`/`tenant-owner` role gate.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

use gondola_auth::{AccountSummary, Actor};
use gondola_core::UserId;

use crate::app::AppState;
use crate::app::dto::{RegisterAccountRequest, UpdateStatusRequest};
use crate::app::errors::ApiError;
use crate::context::AuthContext;

fn actor(ctx: &AuthContext) -> Result<Actor, ApiError> {
    ctx.actor().ok_or(ApiError::Forbidden)
}

/// POST /api/v1/accounts - register an account
pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<RegisterAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let actor = actor(&ctx)?;
    let Json(req) = payload?;

    let summary = state
        .accounts
        .register(actor, req.into_new_account(ctx.tenant_id()), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// PUT /api/v1/accounts/:id/status - activate, suspend or park an account
pub async fn set_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<AccountSummary>, ApiError> {
    let actor = actor(&ctx)?;
    let id: UserId = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid account id"))?;
    let Json(req) = payload?;

    let summary = state
        .accounts
        .set_status(actor, id, req.status, Utc::now())
        .await?;
    Ok(Json(summary))
}
