use chrono::Duration;
use eqms_core::config as core_config;
use eqms_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct EqmsConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
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
pub struct TokenConfig {
    pub jwt_secret: String,
    /// Session token lifetime, `JWT_EXPIRES_IN` (e.g. "24h", "30m").
    pub jwt_expires_in: Duration,
    pub auditor_secret: String,
    pub auditor_expires_in: Duration,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Origins allowed by CORS; the SPA lives at `FRONTEND_URL`.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

impl EqmsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = EqmsConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("eqms-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            tokens: TokenConfig {
                jwt_secret: get_env("JWT_SECRET", Some("dev-only-insecure-secret"), is_prod)?,
                jwt_expires_in: parse_duration(&get_env("JWT_EXPIRES_IN", Some("24h"), is_prod)?)
                    .map_err(AppError::ConfigError)?,
                auditor_secret: get_env(
                    "AUDITOR_TOKEN_SECRET",
                    Some("dev-only-insecure-auditor-secret"),
                    is_prod,
                )?,
                auditor_expires_in: parse_duration(&get_env(
                    "AUDITOR_TOKEN_EXPIRES_IN",
                    Some("4h"),
                    is_prod,
                )?)
                .map_err(AppError::ConfigError)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("FRONTEND_URL", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(900),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.tokens.jwt_expires_in <= Duration::zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRES_IN must be positive"
            )));
        }

        if self.tokens.auditor_expires_in <= Duration::zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUDITOR_TOKEN_EXPIRES_IN must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.tokens.jwt_secret.starts_with("dev-only") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be set explicitly in production"
                )));
            }
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
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

/// Parse durations of the form "24h", "30m", "7d", "90s" or a bare
/// number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration, anyhow::Error> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("empty duration");
    }

    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        _ => (value, None),
    };

    let amount: i64 = number
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration '{}'", value))?;

    let duration = match unit {
        None | Some('s') => Duration::seconds(amount),
        Some('m') => Duration::minutes(amount),
        Some('h') => Duration::hours(amount),
        Some('d') => Duration::days(amount),
        Some(other) => anyhow::bail!("invalid duration unit '{}' in '{}'", other, value),
    };

    Ok(duration)
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

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hour_durations() {
        assert_eq!(parse_duration("24h").unwrap(), Duration::hours(24));
        assert_eq!(parse_duration("1h").unwrap(), Duration::hours(1));
    }

    #[test]
    fn parses_minutes_days_and_seconds() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_duration("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_duration("3600").unwrap(), Duration::seconds(3600));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("24x").is_err());
        assert!(parse_duration("abc").is_err());
    }
}
