/*!
 * Runtime configuration
 * Everything the server reads from the environment, resolved once at startup.
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::db::DbConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 600;
/// Lowest bcrypt cost accepted when ENVIRONMENT=production.
pub const MIN_PRODUCTION_BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error(
        "BCRYPT_COST {0} is below {min}; refusing to start in production",
        min = MIN_PRODUCTION_BCRYPT_COST
    )]
    InsecureBcryptCost(u32),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// `None` selects the in-memory store.
    pub database: Option<DbConfig>,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub bcrypt_cost: u32,
    pub admin_password_hash: Option<String>,
    pub seed_content: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            session_sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_SECS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_password_hash: None,
            seed_content: true,
            allowed_origins: Vec::new(),
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(value) => Err(ConfigError::Invalid { key, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let pool = DbConfig::new(url);
                Some(DbConfig {
                    max_connections: parse_or(&lookup, "DB_POOL_MAX", pool.max_connections)?,
                    min_connections: parse_or(&lookup, "DB_POOL_MIN", pool.min_connections)?,
                    connect_timeout_secs: parse_or(
                        &lookup,
                        "DB_CONNECT_TIMEOUT",
                        pool.connect_timeout_secs,
                    )?,
                    idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT", pool.idle_timeout_secs)?,
                    ..pool
                })
            }
            None => None,
        };

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| lookup("FRONTEND_ORIGIN").map(|o| vec![o.trim().to_string()]))
            .unwrap_or_default();

        Ok(Self {
            environment: lookup("ENVIRONMENT")
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(defaults.environment),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            database,
            session_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            session_sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_SWEEP_SECS",
                DEFAULT_SESSION_SWEEP_SECS,
            )?),
            bcrypt_cost,
            admin_password_hash: lookup("ADMIN_PASSWORD_HASH").filter(|h| !h.trim().is_empty()),
            seed_content: parse_flag(&lookup, "SEED_CONTENT", defaults.seed_content)?,
            allowed_origins,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Session cookies carry `Secure` only in production.
    pub fn secure_cookies(&self) -> bool {
        self.is_production()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: raw,
        })
    }

    /// Production safety checks. Hard failures return an error; soft ones
    /// are logged.
    pub fn check_production(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.bcrypt_cost < MIN_PRODUCTION_BCRYPT_COST {
            return Err(ConfigError::InsecureBcryptCost(self.bcrypt_cost));
        }
        if self.admin_password_hash.is_none() {
            tracing::warn!(
                "SECURITY: ADMIN_PASSWORD_HASH is not set. The admin account can be claimed \
                 by whoever calls POST /api/admin/setup first."
            );
        }
        if self.allowed_origins.is_empty() {
            tracing::warn!("ALLOWED_ORIGINS is not set; only localhost origins may use the API");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.database.is_none());
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.session_sweep_interval, Duration::from_secs(600));
        assert!(config.seed_content);
        assert!(!config.is_production());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/portfolio"),
            ("DB_POOL_MAX", "4"),
        ])
        .unwrap();
        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 4);
        assert_eq!(db.min_connections, 2);

        let only_url = config_from(&[("DATABASE_URL", "postgresql://localhost/portfolio")])
            .unwrap()
            .database
            .unwrap();
        assert_eq!(only_url, DbConfig::new("postgresql://localhost/portfolio"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_seed_flag_parsing() {
        assert!(!config_from(&[("SEED_CONTENT", "false")]).unwrap().seed_content);
        assert!(config_from(&[("SEED_CONTENT", "1")]).unwrap().seed_content);
        assert!(config_from(&[("SEED_CONTENT", "maybe")]).is_err());
    }

    #[test]
    fn test_allowed_origins_fall_back_to_frontend_origin() {
        let config = config_from(&[("FRONTEND_ORIGIN", "https://me.dev")]).unwrap();
        assert_eq!(config.allowed_origins, vec!["https://me.dev"]);

        let config = config_from(&[
            ("ALLOWED_ORIGINS", "https://a.dev, https://b.dev"),
            ("FRONTEND_ORIGIN", "https://me.dev"),
        ])
        .unwrap();
        assert_eq!(config.allowed_origins, vec!["https://a.dev", "https://b.dev"]);
    }

    #[test]
    fn test_production_refuses_weak_bcrypt_cost() {
        let config = config_from(&[("ENVIRONMENT", "production"), ("BCRYPT_COST", "4")]).unwrap();
        assert!(config.secure_cookies());
        assert!(matches!(
            config.check_production(),
            Err(ConfigError::InsecureBcryptCost(4))
        ));

        let config = config_from(&[("BCRYPT_COST", "4")]).unwrap();
        assert!(config.check_production().is_ok());
    }

    #[test]
    fn test_out_of_range_bcrypt_cost() {
        assert!(config_from(&[("BCRYPT_COST", "40")]).is_err());
    }

    #[test]
    fn test_bind_addr() {
        let config = config_from(&[("HOST", "0.0.0.0"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        let config = config_from(&[("HOST", "not a host")]).unwrap();
        assert!(config.bind_addr().is_err());
    }
}
