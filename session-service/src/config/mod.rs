use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// One year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
/// Ten years.
pub const MAX_RETENTION_DAYS: i64 = 3660;

#[derive(Debug, Clone)]
pub struct SessionServiceConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    /// 0 disables the limit.
    pub max_per_principal: usize,
    /// 0 disables the reaper.
    pub retention_days: i64,
    pub reaper_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Shared secret the login flow presents on `POST /sessions`.
    pub internal_api_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub create_attempts: u32,
    pub create_window_seconds: u64,
}

impl SessionServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = SessionServiceConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("session-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            session: SessionConfig {
                ttl_hours: parse_env("SESSION_TTL_HOURS", "24", is_prod)?,
                max_per_principal: parse_env("SESSION_MAX_PER_PRINCIPAL", "0", is_prod)?,
                retention_days: parse_env("SESSION_RETENTION_DAYS", "0", is_prod)?,
                reaper_interval_seconds: parse_env(
                    "SESSION_REAPER_INTERVAL_SECONDS",
                    "3600",
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                internal_api_key: Secret::new(get_env("INTERNAL_API_KEY", None, is_prod)?),
            },
            rate_limit: RateLimitConfig {
                create_attempts: get_env("RATE_LIMIT_CREATE_ATTEMPTS", Some("20"), is_prod)?
                    .parse()
                    .unwrap_or(20),
                create_window_seconds: get_env(
                    "RATE_LIMIT_CREATE_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.session.ttl_hours <= 0 || self.session.ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            )));
        }

        if self.session.retention_days < 0 || self.session.retention_days > MAX_RETENTION_DAYS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_RETENTION_DAYS must be between 0 and {}",
                MAX_RETENTION_DAYS
            )));
        }

        if self.session.reaper_interval_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_REAPER_INTERVAL_SECONDS must be positive"
            )));
        }

        if self.security.internal_api_key.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "INTERNAL_API_KEY must not be empty"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.retention_days)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionServiceConfig {
        SessionServiceConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "session-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: "postgres://localhost/sessions".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            session: SessionConfig {
                ttl_hours: 24,
                max_per_principal: 0,
                retention_days: 0,
                reaper_interval_seconds: 3600,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
                internal_api_key: Secret::new("key".to_string()),
            },
            rate_limit: RateLimitConfig {
                create_attempts: 20,
                create_window_seconds: 60,
            },
        }
    }

    #[test]
    fn accepts_sane_defaults() {
        assert!(config().validate().is_ok());
        assert_eq!(config().session_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let mut cfg = config();
        cfg.session.ttl_hours = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_ttl_beyond_one_year() {
        let mut cfg = config();
        cfg.session.ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(cfg.validate().is_ok());

        cfg.session.ttl_hours = MAX_SESSION_TTL_HOURS + 1;
        assert!(cfg.validate().is_err());

        cfg.session.ttl_hours = i64::MAX;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_retention() {
        let mut cfg = config();
        cfg.session.retention_days = -1;
        assert!(cfg.validate().is_err());

        cfg.session.retention_days = i64::MAX;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_wildcard_cors_in_prod() {
        let mut cfg = config();
        cfg.environment = Environment::Prod;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_internal_key() {
        let mut cfg = config();
        cfg.security.internal_api_key = Secret::new(String::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_environment() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Prod));
        assert!("staging".parse::<Environment>().is_err());
    }
}
