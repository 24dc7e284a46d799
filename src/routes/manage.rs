/**
 * Content Management Routes
 * Session-guarded CRUD over skills, projects, certifications and learnings,
 * plus the contact inbox and page-view analytics
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use super::{parse_id, AppState, JsonBody};
use crate::db::models::{AdminSummary, Analytics, ContactMessage, Learning};
use crate::error::{ApiError, ApiResult};
use crate::validation::{CertificationInput, LearningInput, ProjectInput, SkillInput};

type Created = (StatusCode, Json<Value>);

fn created(key: &str, value: impl serde::Serialize) -> ApiResult<Created> {
    Ok((StatusCode::CREATED, Json(saved(key, value)?)))
}

fn saved(key: &str, value: impl serde::Serialize) -> ApiResult<Value> {
    let value = serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("failed to serialize {key}: {e}")))?;
    Ok(json!({ "success": true, key: value }))
}

fn deleted(found: bool, entity: &'static str) -> ApiResult<Json<Value>> {
    if found {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(entity))
    }
}

// ============================================================================
// Skills
// ============================================================================

/// POST /api/admin/skills
pub async fn create_skill(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSummary>,
    JsonBody(input): JsonBody<SkillInput>,
) -> ApiResult<Created> {
    let skill = state.store.create_skill(input.validate_new()?).await?;
    tracing::info!(admin = %admin.username, skill_id = %skill.id, "Skill created");
    created("skill", skill)
}

/// PUT /api/admin/skills/{id}
pub async fn update_skill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<SkillInput>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Skill")?;
    let patch = input.validate_patch()?;
    let skill = state
        .store
        .update_skill(id, patch)
        .await?
        .ok_or(ApiError::NotFound("Skill"))?;
    Ok(Json(saved("skill", skill)?))
}

/// DELETE /api/admin/skills/{id}
pub async fn delete_skill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Skill")?;
    deleted(state.store.delete_skill(id).await?, "Skill")
}

// ============================================================================
// Projects
// ============================================================================

/// POST /api/admin/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSummary>,
    JsonBody(input): JsonBody<ProjectInput>,
) -> ApiResult<Created> {
    let project = state.store.create_project(input.validate_new()?).await?;
    tracing::info!(admin = %admin.username, project_id = %project.id, "Project created");
    created("project", project)
}

/// PUT /api/admin/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ProjectInput>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Project")?;
    let patch = input.validate_patch()?;
    let project = state
        .store
        .update_project(id, patch)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;
    Ok(Json(saved("project", project)?))
}

/// DELETE /api/admin/projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Project")?;
    deleted(state.store.delete_project(id).await?, "Project")
}

// ============================================================================
// Certifications
// ============================================================================

/// POST /api/admin/certifications
pub async fn create_certification(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSummary>,
    JsonBody(input): JsonBody<CertificationInput>,
) -> ApiResult<Created> {
    let cert = state
        .store
        .create_certification(input.validate_new()?)
        .await?;
    tracing::info!(admin = %admin.username, certification_id = %cert.id, "Certification created");
    created("certification", cert)
}

/// PUT /api/admin/certifications/{id}
pub async fn update_certification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<CertificationInput>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Certification")?;
    let patch = input.validate_patch()?;
    let cert = state
        .store
        .update_certification(id, patch)
        .await?
        .ok_or(ApiError::NotFound("Certification"))?;
    Ok(Json(saved("certification", cert)?))
}

/// DELETE /api/admin/certifications/{id}
pub async fn delete_certification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Certification")?;
    deleted(state.store.delete_certification(id).await?, "Certification")
}

// ============================================================================
// Learnings
// ============================================================================

/// GET /api/admin/learnings
/// Includes drafts.
pub async fn list_learnings(State(state): State<AppState>) -> ApiResult<Json<Vec<Learning>>> {
    Ok(Json(state.store.list_learnings().await?))
}

/// POST /api/admin/learnings
pub async fn create_learning(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSummary>,
    JsonBody(input): JsonBody<LearningInput>,
) -> ApiResult<Created> {
    let learning = state.store.create_learning(input.validate_new()?).await?;
    tracing::info!(admin = %admin.username, learning_id = %learning.id, "Learning created");
    created("learning", learning)
}

/// PUT /api/admin/learnings/{id}
pub async fn update_learning(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<LearningInput>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Learning")?;
    let patch = input.validate_patch()?;
    let learning = state
        .store
        .update_learning(id, patch)
        .await?
        .ok_or(ApiError::NotFound("Learning"))?;
    Ok(Json(saved("learning", learning)?))
}

/// DELETE /api/admin/learnings/{id}
pub async fn delete_learning(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Learning")?;
    deleted(state.store.delete_learning(id).await?, "Learning")
}

// ============================================================================
// Inbox & analytics
// ============================================================================

/// GET /api/admin/messages
pub async fn list_messages(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ContactMessage>>> {
    Ok(Json(state.store.list_messages().await?))
}

/// PUT /api/admin/messages/{id}/read
pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Message")?;
    if state.store.mark_message_read(id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound("Message"))
    }
}

/// DELETE /api/admin/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Message")?;
    deleted(state.store.delete_message(id).await?, "Message")
}

/// GET /api/admin/analytics
pub async fn analytics(State(state): State<AppState>) -> ApiResult<Json<Analytics>> {
    Ok(Json(state.store.analytics().await?))
}
