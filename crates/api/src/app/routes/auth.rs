use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::Utc;

use crate::app::AppState;
use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::errors::ApiError;

/// POST /api/v1/auth/login - exchange email + password for an access token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let outcome = state
        .accounts
        .login(&req.email, &req.password, Utc::now())
        .await?;
    Ok(Json(outcome.into()))
}
