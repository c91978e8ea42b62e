use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::i18n::SupportedLanguage;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub booking_draft_ttl_minutes: i64,
    pub default_language: SupportedLanguage,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_DRAFT_TTL_MINUTES: i64 = 30;

impl Config {
    /// Configuration with every optional setting at its default.
    pub fn new(database_url: impl Into<String>) -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 8000,
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: Some(10),
                min_connections: Some(1),
            },
            app: AppConfig {
                name: "Training Center".to_string(),
                environment: Environment::Development,
                upload_dir: PathBuf::from("uploads"),
                upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
                booking_draft_ttl_minutes: DEFAULT_DRAFT_TTL_MINUTES,
                default_language: SupportedLanguage::default(),
            },
        }
    }

    pub fn from_env() -> Result<Self> {
        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let mut config = Config::new(db_url);

        if let Ok(host) = env::var("SERVER_HOST") {
            config.server.host = host.parse().context("Failed to parse SERVER_HOST")?;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            config.server.port = port.parse().context("Failed to parse SERVER_PORT")?;
        }

        if let Ok(val) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections =
                Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?);
        }
        if let Ok(val) = env::var("DATABASE_MIN_CONNECTIONS") {
            config.database.min_connections =
                Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?);
        }

        if let Ok(val) = env::var("APP_ENVIRONMENT") {
            config.app.environment = val.parse().unwrap_or_default();
        }
        if let Ok(name) = env::var("APP_NAME") {
            config.app.name = name;
        }
        if let Ok(dir) = env::var("UPLOAD_DIR") {
            config.app.upload_dir = PathBuf::from(dir);
        }
        if let Ok(val) = env::var("UPLOAD_MAX_BYTES") {
            config.app.upload_max_bytes = val.parse().context("Failed to parse UPLOAD_MAX_BYTES")?;
        }
        if let Ok(val) = env::var("BOOKING_DRAFT_TTL_MINUTES") {
            let minutes: i64 = val
                .parse()
                .context("Failed to parse BOOKING_DRAFT_TTL_MINUTES")?;
            anyhow::ensure!(minutes > 0, "BOOKING_DRAFT_TTL_MINUTES must be positive");
            config.app.booking_draft_ttl_minutes = minutes;
        }
        if let Ok(val) = env::var("DEFAULT_LANGUAGE") {
            config.app.default_language = val
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Failed to parse DEFAULT_LANGUAGE")?;
        }

        Ok(config)
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn booking_draft_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.app.booking_draft_ttl_minutes)
    }

    #[allow(unused)]
    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_optional_settings() {
        let config = Config::new("postgres://localhost/training_center");
        assert_eq!(config.server_addr().port(), 8000);
        assert_eq!(config.app.upload_max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.booking_draft_ttl(), chrono::Duration::minutes(30));
        assert!(!config.is_production());
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert!("qa".parse::<Environment>().is_err());
    }
}
