//! Route handlers.
//!
//! Handlers only translate between HTTP and the registry. Registry calls
//! touch the database, so they run on the blocking pool.

use super::auth::Betas;
use super::error::ApiError;
use super::AppState;
use admiral_core::{
    BatchResultLine, CreateBatchRequest, CreateInviteRequest, CreateWorkspaceRequest, Invite,
    InviteDeleted, InviteId, MessageBatch, MessageBatchDeleted, MessageBatchId, Page, PageRequest,
    Registry, Timestamp, UpdateWorkspaceRequest, Workspace, WorkspaceId,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Content type of the batch results stream.
pub const JSONL_CONTENT_TYPE: &str = "application/x-jsonl";

async fn with_registry<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Registry, Timestamp) -> admiral_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    let now = state.clock.now();
    tokio::task::spawn_blocking(move || f(&registry, now))
        .await
        .map_err(|err| ApiError::internal(format!("registry task failed: {}", err)))?
        .map_err(ApiError::from)
}

fn requested_betas(betas: Option<Extension<Betas>>) -> Vec<String> {
    betas.map(|Extension(Betas(list))| list).unwrap_or_default()
}

fn path_id<T>(
    path: Result<Path<String>, PathRejection>,
    parse: impl FnOnce(String) -> Result<T, admiral_core::IdError>,
) -> Result<T, ApiError> {
    let Path(raw) = path?;
    Ok(parse(raw)?)
}

// =============================================================================
// INVITES
// =============================================================================

pub async fn list_invites(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<Page<Invite>> {
    let Query(page) = query?;
    with_registry(&state, move |reg, now| reg.list_invites(&page, now))
        .await
        .map(Json)
}

pub async fn create_invite(
    State(state): State<AppState>,
    body: Result<Json<CreateInviteRequest>, JsonRejection>,
) -> ApiResult<Invite> {
    let Json(request) = body?;
    let invite = with_registry(&state, move |reg, now| reg.create_invite(&request, now)).await?;
    tracing::info!(invite_id = %invite.id, role = %invite.role, "invite created");
    Ok(Json(invite))
}

pub async fn get_invite(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Invite> {
    let id = path_id(path, InviteId::parse)?;
    with_registry(&state, move |reg, now| reg.get_invite(&id, now))
        .await
        .map(Json)
}

pub async fn delete_invite(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<InviteDeleted> {
    let id = path_id(path, InviteId::parse)?;
    let receipt = with_registry(&state, move |reg, now| reg.delete_invite(&id, now)).await?;
    tracing::info!(invite_id = %receipt.id, "invite deleted");
    Ok(Json(receipt))
}

// =============================================================================
// WORKSPACES
// =============================================================================

/// Query of `GET /v1/organizations/workspaces`.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceListQuery {
    #[serde(default)]
    pub before_id: Option<String>,
    #[serde(default)]
    pub after_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    query: Result<Query<WorkspaceListQuery>, QueryRejection>,
) -> ApiResult<Page<Workspace>> {
    let Query(query) = query?;
    let page = PageRequest {
        before_id: query.before_id,
        after_id: query.after_id,
        limit: query.limit,
    };
    let include_archived = query.include_archived;
    with_registry(&state, move |reg, _| reg.list_workspaces(&page, include_archived))
        .await
        .map(Json)
}

pub async fn create_workspace(
    State(state): State<AppState>,
    body: Result<Json<CreateWorkspaceRequest>, JsonRejection>,
) -> ApiResult<Workspace> {
    let Json(request) = body?;
    let workspace =
        with_registry(&state, move |reg, now| reg.create_workspace(&request, now)).await?;
    tracing::info!(workspace_id = %workspace.id, "workspace created");
    Ok(Json(workspace))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Workspace> {
    let id = path_id(path, WorkspaceId::parse)?;
    with_registry(&state, move |reg, _| reg.get_workspace(&id))
        .await
        .map(Json)
}

pub async fn update_workspace(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateWorkspaceRequest>, JsonRejection>,
) -> ApiResult<Workspace> {
    let id = path_id(path, WorkspaceId::parse)?;
    let Json(request) = body?;
    with_registry(&state, move |reg, _| reg.update_workspace(&id, &request))
        .await
        .map(Json)
}

pub async fn archive_workspace(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Workspace> {
    let id = path_id(path, WorkspaceId::parse)?;
    let workspace = with_registry(&state, move |reg, now| reg.archive_workspace(&id, now)).await?;
    tracing::info!(workspace_id = %workspace.id, "workspace archived");
    Ok(Json(workspace))
}

// =============================================================================
// MESSAGE BATCHES
// =============================================================================

pub async fn list_batches(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<Page<MessageBatch>> {
    let Query(page) = query?;
    with_registry(&state, move |reg, now| reg.list_batches(&page, now))
        .await
        .map(Json)
}

pub async fn create_batch(
    State(state): State<AppState>,
    betas: Option<Extension<Betas>>,
    body: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> ApiResult<MessageBatch> {
    let Json(request) = body?;
    let batch = with_registry(&state, move |reg, now| reg.create_batch(&request, now)).await?;
    tracing::info!(
        message_batch_id = %batch.id,
        requests = batch.request_counts.total(),
        betas = ?requested_betas(betas),
        "message batch created"
    );
    Ok(Json(batch))
}

pub async fn get_batch(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<MessageBatch> {
    let id = path_id(path, MessageBatchId::parse)?;
    with_registry(&state, move |reg, now| reg.get_batch(&id, now))
        .await
        .map(Json)
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<MessageBatch> {
    let id = path_id(path, MessageBatchId::parse)?;
    let batch = with_registry(&state, move |reg, now| reg.cancel_batch(&id, now)).await?;
    tracing::info!(message_batch_id = %batch.id, "message batch cancel initiated");
    Ok(Json(batch))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    betas: Option<Extension<Betas>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<MessageBatchDeleted> {
    let id = path_id(path, MessageBatchId::parse)?;
    let receipt = with_registry(&state, move |reg, now| reg.delete_batch(&id, now)).await?;
    tracing::info!(
        message_batch_id = %receipt.id,
        betas = ?requested_betas(betas),
        "message batch deleted"
    );
    Ok(Json(receipt))
}

/// Results as JSON Lines, one object per request.
pub async fn batch_results(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path, MessageBatchId::parse)?;
    let lines = with_registry(&state, move |reg, now| reg.batch_results(&id, now)).await?;
    let body = render_jsonl(&lines)?;
    Ok(([(header::CONTENT_TYPE, JSONL_CONTENT_TYPE)], body).into_response())
}

fn render_jsonl(lines: &[BatchResultLine]) -> Result<String, ApiError> {
    let mut body = String::new();
    for line in lines {
        let text = serde_json::to_string(line)
            .map_err(|err| ApiError::internal(format!("encoding result line: {}", err)))?;
        body.push_str(&text);
        body.push('\n');
    }
    Ok(body)
}

// =============================================================================
// FALLBACKS
// =============================================================================

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::not_found("Not found: method not supported on this path")
}
