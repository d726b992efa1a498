//! Organization management.
//!
//! Creation is mounted behind the `admin` gate; reads behind the account
//! managers' gate, with non-admins confined to their own organization.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

use gondola_auth::Organization;
use gondola_core::TenantId;

use crate::app::AppState;
use crate::app::dto::CreateOrganizationRequest;
use crate::app::errors::ApiError;
use crate::context::AuthContext;

/// POST /api/v1/organizations - create a tenant
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<CreateOrganizationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let actor = ctx.actor().ok_or(ApiError::Forbidden)?;
    let Json(req) = payload?;

    let organization = state
        .organizations
        .create(actor, req.into(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// GET /api/v1/organizations/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Organization>, ApiError> {
    let actor = ctx.actor().ok_or(ApiError::Forbidden)?;
    let id: TenantId = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid organization id"))?;

    Ok(Json(state.organizations.get(actor, id).await?))
}
