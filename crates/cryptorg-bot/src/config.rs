//! Application configuration, loaded explicitly from the environment.

use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Service-level settings.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    pub version: String,
    pub environment: String,
    pub service_id: String,
    pub log_level: String,
    pub log_format: String,
}

impl BaseConfig {
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Exchange credentials and defaults.
#[derive(Debug, Clone)]
pub struct BybitConfig {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    pub symbol: String,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub base: BaseConfig,
    pub server: ServerConfig,
    pub bybit: BybitConfig,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first when present;
    /// real environment variables win over it.
    pub fn load() -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            base: BaseConfig {
                version: env_or("VERSION", "dev"),
                environment: env_or("ENVIRONMENT", "local"),
                service_id: env_or("SERVICE_ID", "cryptorg-bot"),
                log_level: env_or("LOG_LEVEL", "info"),
                log_format: env_or("LOG_FORMAT", "json"),
            },
            server: ServerConfig {
                port: env_parse("SERVER_PORT", 8080)?,
                read_timeout_secs: env_parse("SERVER_READ_TIMEOUT", 30)?,
                write_timeout_secs: env_parse("SERVER_WRITE_TIMEOUT", 30)?,
                idle_timeout_secs: env_parse("SERVER_IDLE_TIMEOUT", 60)?,
            },
            bybit: BybitConfig {
                api_key: env_required("BYBIT_API_KEY")?,
                api_secret: env_required("BYBIT_API_SECRET")?,
                testnet: env_parse("BYBIT_TESTNET", false)?,
                symbol: env_or("SYMBOL", "SOLUSDT"),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> AppResult<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("required environment variable {key} is not set")))
}

fn env_parse<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value {raw:?} for {key}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        assert_eq!(env_or("CRYPTORG_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn test_env_parse_default_and_override() {
        assert_eq!(env_parse("CRYPTORG_TEST_UNSET_PORT", 8080u16).unwrap(), 8080);

        std::env::set_var("CRYPTORG_TEST_PORT", "9000");
        assert_eq!(env_parse("CRYPTORG_TEST_PORT", 8080u16).unwrap(), 9000);

        std::env::set_var("CRYPTORG_TEST_BAD_PORT", "not-a-port");
        assert!(env_parse("CRYPTORG_TEST_BAD_PORT", 8080u16).is_err());
    }

    #[test]
    fn test_env_required_rejects_missing_and_empty() {
        assert!(env_required("CRYPTORG_TEST_UNSET_KEY").is_err());

        std::env::set_var("CRYPTORG_TEST_EMPTY_KEY", "");
        assert!(env_required("CRYPTORG_TEST_EMPTY_KEY").is_err());

        std::env::set_var("CRYPTORG_TEST_SET_KEY", "value");
        assert_eq!(env_required("CRYPTORG_TEST_SET_KEY").unwrap(), "value");
    }

    #[test]
    fn test_production_detection() {
        let base = BaseConfig {
            version: "dev".to_string(),
            environment: "Production".to_string(),
            service_id: "cryptorg-bot".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        };
        assert!(base.is_production());

        let base = BaseConfig {
            environment: "local".to_string(),
            ..base
        };
        assert!(!base.is_production());
    }
}
