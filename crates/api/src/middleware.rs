//! Request authentication and role gating.
//!
//! `auth_middleware` turns a bearer token into an [`AuthContext`];
//! `role_gate` compares that context's role against a per-route allow-list.
//! Both short-circuit with an [`AuthRejection`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gondola_auth::{AllowedRoles, JwtValidator};

use crate::app::errors::AuthRejection;
use crate::context::AuthContext;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(reason = %e, "token rejected");
        AuthRejection::InvalidToken
    })?;

    let (Ok(subject_id), Ok(tenant_id)) = (claims.subject_id(), claims.tenant_id()) else {
        tracing::debug!("token ids are not valid identifiers");
        return Err(AuthRejection::InvalidIds);
    };

    req.extensions_mut()
        .insert(AuthContext::new(subject_id, tenant_id, claims.role));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .ok_or(AuthRejection::MissingAuthorization)?;

    let header = header.to_str().map_err(|_| AuthRejection::InvalidFormat)?;

    header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthRejection::InvalidFormat)
}

/// Forward only requests whose authenticated role is in `allowed`.
///
/// Without an upstream `auth_middleware` there is no context, and the empty
/// role matches nothing.
pub async fn role_gate(
    State(allowed): State<AllowedRoles>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let role = req
        .extensions()
        .get::<AuthContext>()
        .map(AuthContext::role_str)
        .unwrap_or_default();

    if !allowed.permits(role) {
        tracing::debug!(role, allowed = ?allowed.roles(), "role not allowed");
        return Err(AuthRejection::AccessDenied);
    }

    Ok(next.run(req).await)
}
