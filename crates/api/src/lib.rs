//! HTTP API: configuration, request context, auth middleware and routing.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
