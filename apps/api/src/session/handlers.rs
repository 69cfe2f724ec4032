use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cv::mutation::SectionPatch;
use crate::cv::{Document, SectionType};
use crate::errors::AppError;
use crate::ingestion::ReadinessState;
use crate::state::AppState;

#[derive(Serialize)]
pub struct MutationResponse {
    pub applied: bool,
}

#[derive(Serialize)]
pub struct SaveResponse {
    /// `None` when nothing changed since the last save.
    pub version: Option<i32>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    pub job_id: String,
}

#[derive(Deserialize)]
pub struct PersonalInfoUpdate {
    pub field: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct SummaryUpdate {
    pub value: String,
}

#[derive(Deserialize)]
pub struct AddSectionRequest {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct MoveSectionRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Deserialize)]
pub struct ItemFieldUpdate {
    pub field: String,
    pub value: Value,
}

#[derive(Deserialize)]
pub struct BulletUpdate {
    pub text: String,
}

async fn apply<F>(state: &AppState, cv_id: Uuid, edit: F) -> Result<Json<MutationResponse>, AppError>
where
    F: FnOnce(&mut Document) -> bool,
{
    let session = state.sessions.session(cv_id).await?;
    let applied = session.mutate(edit).await;
    Ok(Json(MutationResponse { applied }))
}

/// POST /api/v1/cvs/:cv_id/ingest
pub async fn handle_start_ingest(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<IngestRequest>,
) -> Result<StatusCode, AppError> {
    if req.job_id.trim().is_empty() {
        return Err(AppError::Validation("job_id must not be empty".into()));
    }
    state.sessions.start_ingestion(cv_id, req.job_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/cvs/:cv_id/readiness
pub async fn handle_readiness(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<ReadinessState>, AppError> {
    state
        .sessions
        .readiness(cv_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No ingestion job for CV {cv_id}")))
}

/// POST /api/v1/cvs/:cv_id/session
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    let session = state.sessions.open_from_store(cv_id).await?;
    Ok(Json(session.snapshot().await))
}

/// DELETE /api/v1/cvs/:cv_id/session
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    let version = state.sessions.close(cv_id).await?;
    Ok(Json(SaveResponse { version }))
}

/// GET /api/v1/cvs/:cv_id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    let session = state.sessions.session(cv_id).await?;
    Ok(Json(session.snapshot().await))
}

/// POST /api/v1/cvs/:cv_id/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    let session = state.sessions.session(cv_id).await?;
    let version = session.save_now().await?;
    Ok(Json(SaveResponse { version }))
}

/// GET /api/v1/cvs/:cv_id/export.md
pub async fn handle_export_markdown(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.session(cv_id).await?;
    let md = session.export_markdown().await;
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], md))
}

/// PATCH /api/v1/cvs/:cv_id/personal-info
pub async fn handle_update_personal_info(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<PersonalInfoUpdate>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.update_personal_info(&req.field, &req.value)).await
}

/// PUT /api/v1/cvs/:cv_id/summary
pub async fn handle_update_summary(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<SummaryUpdate>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.update_summary(&req.value)).await
}

/// POST /api/v1/cvs/:cv_id/sections
pub async fn handle_add_section(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<AddSectionRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    if req.section_type.as_str().is_empty() {
        return Err(AppError::Validation("section type must not be empty".into()));
    }
    apply(&state, cv_id, |doc| doc.add_section(req.section_type, req.title)).await
}

/// POST /api/v1/cvs/:cv_id/sections/move
pub async fn handle_move_section(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Json(req): Json<MoveSectionRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.move_section(req.from, req.to)).await
}

/// PATCH /api/v1/cvs/:cv_id/sections/:si
pub async fn handle_update_section(
    State(state): State<AppState>,
    Path((cv_id, si)): Path<(Uuid, usize)>,
    Json(patch): Json<SectionPatch>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.update_section(si, patch)).await
}

/// POST /api/v1/cvs/:cv_id/sections/:si/items
pub async fn handle_add_section_item(
    State(state): State<AppState>,
    Path((cv_id, si)): Path<(Uuid, usize)>,
    Json(raw): Json<Value>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.add_section_item(si, &raw)).await
}

/// PATCH /api/v1/cvs/:cv_id/sections/:si/items/:ii
pub async fn handle_update_section_item(
    State(state): State<AppState>,
    Path((cv_id, si, ii)): Path<(Uuid, usize, usize)>,
    Json(req): Json<ItemFieldUpdate>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| {
        doc.update_section_item(si, ii, &req.field, &req.value)
    })
    .await
}

/// DELETE /api/v1/cvs/:cv_id/sections/:si/items/:ii
pub async fn handle_delete_section_item(
    State(state): State<AppState>,
    Path((cv_id, si, ii)): Path<(Uuid, usize, usize)>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.delete_section_item(si, ii)).await
}

/// POST /api/v1/cvs/:cv_id/sections/:si/items/:ii/bullets
pub async fn handle_add_bullet(
    State(state): State<AppState>,
    Path((cv_id, si, ii)): Path<(Uuid, usize, usize)>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.add_bullet(si, ii)).await
}

/// PUT /api/v1/cvs/:cv_id/sections/:si/items/:ii/bullets/:k
pub async fn handle_update_bullet(
    State(state): State<AppState>,
    Path((cv_id, si, ii, k)): Path<(Uuid, usize, usize, usize)>,
    Json(req): Json<BulletUpdate>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.update_bullet(si, ii, k, &req.text)).await
}

/// DELETE /api/v1/cvs/:cv_id/sections/:si/items/:ii/bullets/:k
pub async fn handle_delete_bullet(
    State(state): State<AppState>,
    Path((cv_id, si, ii, k)): Path<(Uuid, usize, usize, usize)>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, cv_id, |doc| doc.delete_bullet(si, ii, k)).await
}
