//! Admin API: the control plane over the registrar.
//!
//! # Endpoints
//! - `GET /admin/status` — version, router namespace, registration mode
//! - `GET /admin/routes` — current route table
//! - `PUT /admin/routes` — register a route
//! - `DELETE /admin/routes/{component}` — deregister a component's route
//! - `GET /admin/match?host=&uri=` — which entry a request would hit
//!
//! All endpoints require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::routing::registrar::Registrar;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registrar: Arc<Registrar>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(registrar: Arc<Registrar>, api_key: &str) -> Self {
        Self {
            registrar,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(list_routes).put(register_route))
        .route("/admin/routes/{component}", delete(delete_route))
        .route("/admin/match", get(match_route))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
