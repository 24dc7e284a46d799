/**
 * Admin Session Routes
 * Login, logout, session introspection, first-run setup and the guard that
 * protects every other /api/admin route
 */
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{AppState, JsonBody};
use crate::db::models::{AdminSummary, AdminUser, NewAdmin};
use crate::error::{ApiError, ApiResult};
use crate::session::{set_cookie_value, token_from_headers};
use crate::store::{seed::ADMIN_USERNAME, StoreError};
use crate::validation::MIN_ADMIN_PASSWORD_CHARS;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/admin/login
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for POST /api/admin/setup
#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    pub admin: AdminSummary,
}

/// Response for GET /api/admin/session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminSummary>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============================================================================
// Helpers
// ============================================================================

lazy_static::lazy_static! {
    static ref DUMMY_HASH: String =
        bcrypt::hash("no-such-admin", bcrypt::DEFAULT_COST).unwrap_or_default();
}

/// Hash to check a login against: the admin's own, or a throwaway one.
fn credential_hash(admin: Option<&AdminUser>) -> String {
    match admin {
        Some(admin) => admin.password_hash.clone(),
        None => DUMMY_HASH.clone(),
    }
}

async fn verify_password(password: String, hash: String) -> bool {
    // bcrypt is CPU-bound; keep it off the async executor.
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    match tokio::task::spawn_blocking(move || bcrypt::hash(&password, cost)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(e)) => Err(ApiError::Internal(format!("failed to hash password: {e}"))),
        Err(e) => Err(ApiError::Internal(format!("password hashing task failed: {e}"))),
    }
}

fn cookie_header(cookie: &cookie::Cookie<'_>) -> ApiResult<HeaderValue> {
    set_cookie_value(cookie).map_err(|e| ApiError::Internal(format!("invalid session cookie: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Response> {
    let username = payload.username.trim();
    let found = state.store.find_admin(username).await?;

    // Unknown users still pay for a bcrypt check.
    let hash = credential_hash(found.as_ref());
    let password_ok = !payload.password.is_empty() && verify_password(payload.password, hash).await;

    let admin = match found {
        Some(admin) if password_ok => admin,
        Some(_) => {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            tracing::warn!(username = %username, "Failed login attempt for unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let previous = token_from_headers(&headers);
    let token = state
        .sessions
        .start(admin.summary(), previous.as_deref())
        .await;
    let cookie = cookie_header(&state.sessions.cookie(&token))?;
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AdminResponse {
            success: true,
            admin: admin.summary(),
        }),
    )
        .into_response())
}

/// POST /api/admin/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token) = token_from_headers(&headers) {
        state.sessions.end(&token).await;
    }
    let cookie = cookie_header(&state.sessions.clear_cookie())?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse { success: true }),
    )
        .into_response())
}

/// GET /api/admin/session
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let resolved = match token_from_headers(&headers) {
        Some(token) => state
            .sessions
            .resolve(&token)
            .await
            .map(|admin| (token, admin)),
        None => None,
    };

    match resolved {
        Some((token, admin)) => {
            let cookie = cookie_header(&state.sessions.cookie(&token))?;
            Ok((
                [(header::SET_COOKIE, cookie)],
                Json(SessionResponse {
                    authenticated: true,
                    admin: Some(admin),
                }),
            )
                .into_response())
        }
        None => Ok(Json(SessionResponse {
            authenticated: false,
            admin: None,
        })
        .into_response()),
    }
}

/// POST /api/admin/setup
/// Create the admin account. Only works while none exists.
pub async fn setup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SetupRequest>,
) -> ApiResult<(StatusCode, Json<AdminResponse>)> {
    if state.store.find_admin(ADMIN_USERNAME).await?.is_some() {
        return Err(ApiError::BadRequest("Admin already exists".to_string()));
    }

    let password = payload.password.unwrap_or_default();
    if password.chars().count() < MIN_ADMIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_ADMIN_PASSWORD_CHARS} characters"
        )));
    }

    let password_hash = hash_password(password, state.config.bcrypt_cost).await?;
    let admin = match state
        .store
        .create_admin(NewAdmin {
            username: ADMIN_USERNAME.to_string(),
            password_hash,
        })
        .await
    {
        Ok(admin) => admin,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::BadRequest("Admin already exists".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(admin_id = %admin.id, "Admin account created via setup");

    Ok((
        StatusCode::CREATED,
        Json(AdminResponse {
            success: true,
            admin: admin.summary(),
        }),
    ))
}

/// Guard for protected admin routes. Anonymous requests get 401; a live
/// session is extended, its admin is attached as a request extension and the
/// refreshed cookie is re-issued.
pub async fn require_admin(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = token_from_headers(request.headers()) else {
        return ApiError::Unauthorized.into_response();
    };
    let Some(admin) = state.sessions.resolve(&token).await else {
        return ApiError::Unauthorized.into_response();
    };

    request.extensions_mut().insert(admin);
    let mut response = next.run(request).await;

    match set_cookie_value(&state.sessions.cookie(&token)) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Failed to re-issue session cookie"),
    }
    response
}
