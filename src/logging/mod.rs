/*!
 * Logging
 * Console plus daily-rolling files under `LOG_DIR`. Production writes JSON
 * and keeps a separate error log.
 */
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging knobs read from the environment before the rest of the config,
/// so config problems themselves get logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub environment: String,
    pub log_dir: String,
    pub level: String,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let level = lookup("LOG_LEVEL").unwrap_or_else(|| {
            if environment == "production" { "info" } else { "debug" }.to_string()
        });
        Self {
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            environment,
            level,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_directives(&self) -> String {
        format!(
            "portfolio_api={},tower_http=debug,axum=debug,sqlx=warn",
            self.level
        )
    }
}

/// Install the global subscriber. The returned guards flush the background
/// writers when dropped; hold them until the process exits.
pub fn init() -> Vec<WorkerGuard> {
    let settings = LogSettings::from_env();
    if let Err(e) = std::fs::create_dir_all(&settings.log_dir) {
        eprintln!("Failed to create log directory {}: {e}", settings.log_dir);
    }

    let (app_writer, app_guard) = non_blocking(rolling::daily(&settings.log_dir, "app.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());
    let mut guards = vec![app_guard, console_guard];

    let layers: Vec<BoxedLayer> = if settings.is_production() {
        let (error_writer, error_guard) =
            non_blocking(rolling::daily(&settings.log_dir, "error.log"));
        guards.push(error_guard);

        vec![
            fmt::layer()
                .json()
                .with_writer(app_writer)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_file(true)
                .with_line_number(true)
                .with_filter(LevelFilter::ERROR)
                .boxed(),
            fmt::layer()
                .json()
                .with_writer(console_writer)
                .with_target(false)
                .boxed(),
        ]
    } else {
        vec![
            fmt::layer()
                .with_writer(app_writer)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed(),
            fmt::layer().with_writer(console_writer).pretty().boxed(),
        ]
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directives()));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();

    tracing::info!(
        log_dir = %settings.log_dir,
        environment = %settings.environment,
        "Logging initialized"
    );
    guards
}
