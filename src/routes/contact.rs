/**
 * Contact & Analytics Routes
 * The two public write endpoints
 */
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use super::{AppState, JsonBody};
use crate::db::models::ContactMessage;
use crate::error::ApiResult;
use crate::validation::{ContactInput, PageViewInput};

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: ContactMessage,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ContactInput>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let new = input.validate()?;
    let message = state.store.create_message(new).await?;
    tracing::info!(message_id = %message.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            success: true,
            message,
        }),
    ))
}

/// POST /api/analytics/pageview
pub async fn record_page_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<PageViewInput>,
) -> ApiResult<(StatusCode, Json<SuccessResponse>)> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let new = input.validate(user_agent)?;
    state.store.record_page_view(new).await?;

    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true })))
}
