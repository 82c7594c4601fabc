use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use backup_console_core::{PageRequest, ResourceScope, View};
use backup_console_storage::{load_backups_page, BackupCatalog, BackupsPage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn BackupCatalog>,
    /// Source of the evaluation instant for last-backup lookups.
    pub clock: fn() -> DateTime<Utc>,
    pub default_limit: u32,
    pub api_token: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/healthz", get(healthz))
        .route("/api/v1/databases/{database_id}/backups", get(database_backups))
        .route(
            "/api/v1/resources/{resource_type}/{resource_id}/backups",
            get(resource_backups),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

/// Raw query values; anything unparsable falls back to its default.
#[derive(Debug, Deserialize, Default)]
struct PageParams {
    page: Option<String>,
    limit: Option<String>,
    view: Option<String>,
}

fn require_api_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.api_token else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "unauthorized"})),
        )),
    }
}

async fn database_backups(
    Path(database_id): Path<String>,
    Query(params): Query<PageParams>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BackupsPage>, ApiError> {
    require_api_auth(&state, &headers)?;
    backups_page(&state, ResourceScope::database(database_id), &params).await
}

async fn resource_backups(
    Path((resource_type, resource_id)): Path<(String, String)>,
    Query(params): Query<PageParams>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BackupsPage>, ApiError> {
    require_api_auth(&state, &headers)?;
    backups_page(&state, ResourceScope::new(resource_type, resource_id), &params).await
}

async fn backups_page(
    state: &AppState,
    scope: ResourceScope,
    params: &PageParams,
) -> Result<Json<BackupsPage>, ApiError> {
    let request = PageRequest::from_query(
        params.page.as_deref(),
        params.limit.as_deref(),
        params.view.as_deref(),
        state.default_limit,
        View::Grid,
    );
    let now = (state.clock)();

    match load_backups_page(state.catalog.as_ref(), &scope, request, now).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            error!(
                error = %e,
                resource_type = %scope.resource_type,
                resource_id = %scope.resource_id,
                "backups page aggregation failed"
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "archive_id": e.archive_id(),
                })),
            ))
        }
    }
}
