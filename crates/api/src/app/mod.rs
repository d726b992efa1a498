//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: token issuer/validator and use-case service construction
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: the JSON error envelope

use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use gondola_auth::{AccountService, AllowedRoles, OrganizationService, Role};

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// State shared by handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub organizations: Arc<OrganizationService>,
}

/// Roles allowed to manage accounts.
pub fn account_managers() -> AllowedRoles {
    AllowedRoles::new([Role::Admin, Role::TenantOwner])
}

/// Roles allowed to create organizations.
pub fn platform_admins() -> AllowedRoles {
    AllowedRoles::new([Role::Admin])
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = AuthState { jwt: services.jwt };
    let state = AppState {
        accounts: services.accounts,
        organizations: services.organizations,
    };

    let account_routes = Router::new()
        .route("/accounts", post(routes::accounts::register))
        .route("/accounts/:id/status", put(routes::accounts::set_status))
        .route("/organizations/:id", get(routes::organizations::get))
        .route_layer(from_fn_with_state(account_managers(), middleware::role_gate));

    let admin_routes = Router::new()
        .route("/organizations", post(routes::organizations::create))
        .route_layer(from_fn_with_state(platform_admins(), middleware::role_gate));

    // Authentication wraps every route added so far, gated ones included.
    let protected = Router::new()
        .route("/me", get(routes::system::me))
        .merge(account_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(auth_state, middleware::auth_middleware));

    let api_v1 = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .merge(protected);

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    services.request_timeout,
                )),
        )
        .with_state(state)
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
