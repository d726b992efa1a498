//! JSON error envelope and the error types handlers and middleware return.
//!
//! Every rejection renders as `{"error": {"code": <status>, "message": <text>}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use gondola_auth::{AccountError, LoginError, OrganizationError};
use gondola_core::DomainError;

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message.into(),
            }
        })),
    )
        .into_response()
}

fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

/// Short-circuit responses of the auth middleware and the role gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing authorization")]
    MissingAuthorization,

    #[error("invalid token format")]
    InvalidFormat,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token does not contain valid ids")]
    InvalidIds,

    #[error("access denied")]
    AccessDenied,
}

impl AuthRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::AccessDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}

/// Handler-level failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Organization(#[from] OrganizationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("access denied")]
    Forbidden,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Login(LoginError::InvalidCredentials) => {
                json_error(StatusCode::UNAUTHORIZED, LoginError::InvalidCredentials.to_string())
            }
            ApiError::Login(err @ LoginError::AccountNotActive(_)) => {
                json_error(StatusCode::FORBIDDEN, err.to_string())
            }
            ApiError::Login(
                err @ (LoginError::Directory(_) | LoginError::Password(_) | LoginError::Token(_)),
            ) => {
                tracing::error!(error = %err, "login failed internally");
                internal_error()
            }
            ApiError::Account(AccountError::Domain(err)) => domain_error(err, "account"),
            ApiError::Account(err @ AccountError::Directory(_)) => {
                tracing::error!(error = %err, "account operation failed internally");
                internal_error()
            }
            ApiError::Account(AccountError::Password(err)) => {
                tracing::error!(error = %err, "password hashing failed");
                internal_error()
            }
            ApiError::Organization(OrganizationError::Domain(err)) => {
                domain_error(err, "organization")
            }
            ApiError::Organization(err @ OrganizationError::Directory(_)) => {
                tracing::error!(error = %err, "organization operation failed internally");
                internal_error()
            }
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden => json_error(StatusCode::FORBIDDEN, "access denied"),
        }
    }
}

fn domain_error(err: DomainError, resource: &str) -> Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, format!("{resource} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "access denied"),
    }
}
