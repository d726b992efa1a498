use axum::{Extension, Json, http::StatusCode};
use serde_json::{Value, json};

use crate::app::dto::MeResponse;
use crate::context::AuthContext;

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /api/v1/me - the identity the presented token resolved to
pub async fn me(Extension(ctx): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse::from(&ctx))
}
