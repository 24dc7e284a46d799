/**
 * Routes Module
 * API route handlers and the state they share
 */
pub mod admin;
pub mod contact;
pub mod content;
pub mod health;
pub mod manage;

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::session::Sessions;
use crate::store::{ContentStore, MemoryStore};

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub sessions: Sessions,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, sessions: Sessions, config: Config) -> Self {
        Self {
            store,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Empty in-memory store with in-memory sessions.
    pub fn in_memory(config: Config) -> Self {
        let sessions = Sessions::in_memory(config.session_ttl, config.secure_cookies());
        Self::new(Arc::new(MemoryStore::new()), sessions, config)
    }
}

/// `Json<T>` whose rejection is reported as a validation error on `body`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(ApiError::Validation(vec![FieldError::new(
                    "body",
                    rejection.body_text(),
                )]))
            }
        }
    }
}

/// Path ids that are not UUIDs cannot name a row, so they are reported as
/// missing rather than malformed.
pub(crate) fn parse_id(raw: &str, entity: &'static str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(entity))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::models::NewAdmin;
    use crate::store::seed::ADMIN_USERNAME;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    pub const TEST_PASSWORD: &str = "correct horse";

    pub fn test_config() -> Config {
        Config {
            bcrypt_cost: 4,
            ..Config::default()
        }
    }

    pub fn test_state() -> AppState {
        AppState::in_memory(test_config())
    }

    pub fn app(state: &AppState) -> Router {
        crate::create_app(state.clone())
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub set_cookie: Option<String>,
        pub body: serde_json::Value,
    }

    pub async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut req = axum::http::Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn get(state: &AppState, uri: &str) -> TestResponse {
        send(state, Method::GET, uri, None, None).await
    }

    pub async fn create_admin(state: &AppState) {
        let hash = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
        state
            .store
            .create_admin(NewAdmin {
                username: ADMIN_USERNAME.to_string(),
                password_hash: hash,
            })
            .await
            .unwrap();
    }

    /// Log in as the test admin and return the `Cookie` header to send back.
    pub async fn login(state: &AppState) -> String {
        create_admin(state).await;
        let res = send(
            state,
            Method::POST,
            "/api/admin/login",
            Some(serde_json::json!({"username": ADMIN_USERNAME, "password": TEST_PASSWORD})),
            None,
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        cookie_pair(&res.set_cookie.unwrap())
    }

    /// `name=value` part of a `Set-Cookie` header.
    pub fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }
}
