// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::response::{ApiError, ApiResponse, CommandEntry, CommandResponse, ScanPayload};
use super::AppState;
use crate::catalog::{self, ToolInfo};
use crate::dns::DnsRecords;
use crate::metrics;
use crate::scanner::ScanTarget;

#[derive(Debug, Deserialize)]
pub struct ScanParams {
    host: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DnsParams {
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    command: String,
}

/// Non-empty, trimmed query value or a 400 naming the parameter
fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{what} parameter required")))
}

pub async fn scan(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScanParams>,
) -> Result<Json<ApiResponse<ScanPayload>>, ApiError> {
    let host = required(params.host, "Host")?;
    let target = ScanTarget::new(host)?;

    let result = state.engine.scan(&target, &state.ports).await?;
    info!(
        target = %result.target(),
        open = result.open_ports().len(),
        "scan served"
    );

    Ok(ApiResponse::success(ScanPayload {
        host: result.target().to_string(),
        open_ports: result.open_ports().to_vec(),
        total_scanned: result.ports_scanned(),
    }))
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Result<Json<Value>, ApiError> {
    let ip = required(params.ip, "IP")?;
    let details = state.lookup.lookup(&ip).await?;
    Ok(Json(details))
}

pub async fn dns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DnsParams>,
) -> Result<Json<DnsRecords>, ApiError> {
    let domain = required(params.domain, "Domain")?;
    let records = state.dns.resolve(&domain).await?;
    Ok(Json(records))
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.command.trim().is_empty() {
        return Err(ApiError::BadRequest("Command is required".to_string()));
    }

    let outcome = state.guard.execute(&request.command).await?;
    Ok(Json(CommandResponse::from(outcome)))
}

pub async fn list_commands(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<CommandEntry>>> {
    let entries = state
        .guard
        .allowlist()
        .iter()
        .map(|(name, description)| CommandEntry {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();
    ApiResponse::success(entries)
}

pub async fn list_tools() -> Json<ApiResponse<&'static [ToolInfo]>> {
    ApiResponse::success(catalog::all_tools())
}

pub async fn get_tool(Path(id): Path<String>) -> Result<Json<ApiResponse<&'static ToolInfo>>, ApiError> {
    catalog::tool_info(&id)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown tool: {id}")))
}

pub async fn tools_in_category(Path(category): Path<String>) -> Json<ApiResponse<Vec<&'static ToolInfo>>> {
    ApiResponse::success(catalog::tools_by_category(&category))
}

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

pub async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}
