use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::RouteConfig;
use crate::routing::entry::RouteEntry;
use crate::routing::error::RouteError;
use crate::routing::matcher::{normalize_host, select_route};

#[derive(Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub router_namespace: String,
    pub mode: String,
    pub routes: usize,
}

#[derive(Deserialize)]
pub struct MatchQuery {
    pub host: String,
    #[serde(default = "root_uri")]
    pub uri: String,
}

fn root_uri() -> String {
    "/".to_string()
}

#[derive(Serialize, Deserialize)]
pub struct MatchResult {
    pub host: String,
    pub uri: String,
    pub route: Option<RouteEntry>,
}

/// A registrar error rendered as JSON.
pub struct AdminError(RouteError);

impl From<RouteError> for AdminError {
    fn from(e: RouteError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RouteError::InlineRoutesMode { .. } => StatusCode::CONFLICT,
            RouteError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Admin request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Result<Json<SystemStatus>, AdminError> {
    let registrar = &state.registrar;
    let table = registrar.routes().await?;
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        router_namespace: registrar.namespace().to_string(),
        mode: if registrar.is_inline() { "inline" } else { "dynamic" }.to_string(),
        routes: table.len(),
    }))
}

pub async fn list_routes(State(state): State<AdminState>) -> Result<Json<Vec<RouteEntry>>, AdminError> {
    let table = state.registrar.routes().await?;
    Ok(Json(table.entries().to_vec()))
}

pub async fn register_route(
    State(state): State<AdminState>,
    Json(body): Json<RouteConfig>,
) -> Result<Json<RouteEntry>, AdminError> {
    let entry = state.registrar.register(&body.component, &body.route).await?;
    Ok(Json(entry))
}

pub async fn delete_route(
    State(state): State<AdminState>,
    Path(component): Path<String>,
) -> Result<StatusCode, AdminError> {
    if state.registrar.deregister(&component).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

pub async fn match_route(
    State(state): State<AdminState>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<MatchResult>, AdminError> {
    let table = state.registrar.routes().await?;
    let host = normalize_host(&query.host);
    let route = select_route(table.entries(), &host, &query.uri).cloned();
    Ok(Json(MatchResult {
        host,
        uri: query.uri,
        route,
    }))
}
