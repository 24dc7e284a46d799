//! Portfolio API - library for app logic and testing

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod store;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use config::{Config, ConfigError};
use routes::{admin, contact, content, health, manage, AppState};
use session::Sessions;
use store::{ContentStore, MemoryStore, PgStore, StoreError};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// CORS for the configured origins, or the local frontend dev servers when
/// none are configured. Credentials are allowed so the session cookie flows.
pub fn configure_cors(origins: &[String]) -> CorsLayer {
    let mut allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        allowed = vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ];
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config.allowed_origins);

    let protected = Router::new()
        .route("/api/admin/skills", post(manage::create_skill))
        .route(
            "/api/admin/skills/{id}",
            put(manage::update_skill).delete(manage::delete_skill),
        )
        .route("/api/admin/projects", post(manage::create_project))
        .route(
            "/api/admin/projects/{id}",
            put(manage::update_project).delete(manage::delete_project),
        )
        .route("/api/admin/certifications", post(manage::create_certification))
        .route(
            "/api/admin/certifications/{id}",
            put(manage::update_certification).delete(manage::delete_certification),
        )
        .route(
            "/api/admin/learnings",
            get(manage::list_learnings).post(manage::create_learning),
        )
        .route(
            "/api/admin/learnings/{id}",
            put(manage::update_learning).delete(manage::delete_learning),
        )
        .route("/api/admin/messages", get(manage::list_messages))
        .route(
            "/api/admin/messages/{id}",
            axum::routing::delete(manage::delete_message),
        )
        .route("/api/admin/messages/{id}/read", put(manage::mark_message_read))
        .route("/api/admin/analytics", get(manage::analytics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    Router::new()
        .route("/api/skills", get(content::list_skills))
        .route("/api/projects", get(content::list_projects))
        .route("/api/projects/{id}", get(content::get_project))
        .route("/api/certifications", get(content::list_certifications))
        .route("/api/learnings", get(content::list_learnings))
        .route("/api/learnings/{id}", get(content::get_learning))
        .route("/api/technologies", get(content::list_technologies))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/analytics/pageview", post(contact::record_page_view))
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/session", get(admin::session))
        .route("/api/admin/setup", post(admin::setup))
        .merge(protected)
        .route("/health", get(health::health_ping))
        .route("/health/detailed", get(health::health_detailed))
        .route("/health/ready", get(health::health_ready))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Pick the storage backend and assemble the shared state.
pub async fn build_state(config: Config) -> Result<AppState, StartupError> {
    let store: Arc<dyn ContentStore> = match &config.database {
        Some(db_config) => {
            let pool = db::init_pool(db_config.clone()).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set. Using the in-memory store; content is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    let sessions = Sessions::in_memory(config.session_ttl, config.secure_cookies());
    Ok(AppState::new(store, sessions, config))
}

/// Seed empty tables in the background and bootstrap the admin account.
async fn prepare_content(state: &AppState) -> Result<(), StartupError> {
    if let Some(hash) = &state.config.admin_password_hash {
        store::seed::seed_admin(state.store.as_ref(), hash).await?;
    }

    if state.config.seed_content {
        let content = state.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store::seed::seed_content(content.as_ref()).await {
                tracing::error!(error = %e, "Content seed failed");
            }
        });
    }
    Ok(())
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    let _log_guards = logging::init();
    routes::health::init_start_time();

    let config = Config::from_env()?;
    config.check_production()?;
    let addr = config.bind_addr()?;
    let sweep_every = config.session_sweep_interval;

    let state = build_state(config).await?;
    prepare_content(&state).await?;
    let sweeper = state.sessions.spawn_sweeper(sweep_every);

    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let res = send(&test_state(), Method::GET, "/api/nothing", None, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_admin_route_is_not_guarded() {
        let res = send(&test_state(), Method::GET, "/api/admin/nothing", None, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_build_state_without_database_uses_memory() {
        let state = build_state(routes::test_support::test_config())
            .await
            .unwrap();
        assert_eq!(state.store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_prepare_content_bootstraps_admin_and_seeds() {
        let mut config = routes::test_support::test_config();
        config.admin_password_hash = Some(bcrypt::hash("bootstrap", 4).unwrap());
        let state = AppState::in_memory(config);
        prepare_content(&state).await.unwrap();

        assert!(state.store.find_admin("admin").await.unwrap().is_some());
        for _ in 0..50 {
            if !state.store.list_learnings().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("background seed did not run");
    }

    #[test]
    fn test_cors_accepts_configured_origins() {
        let _layer = configure_cors(&["https://me.dev".to_string(), "bad\norigin".to_string()]);
    }
}
