//! Web server configuration.
//!
//! Layered with the `config` crate, lowest priority first:
//!
//! 1. built-in defaults (below)
//! 2. optional TOML file, `stitch.toml` or the path in `STITCH_CONFIG`
//! 3. `STITCH__SECTION__KEY` environment variables
//!    (e.g. `STITCH__AUTH__JWT_SECRET`, `STITCH__SERVER__PORT`)
//!
//! `auth.jwt_secret` has no default and must be set.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use stitch_core::Locale;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "STITCH_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "stitch.toml";

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the auth provider
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `aud` claim
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// ISO code shown next to amounts
    pub currency: String,
    pub payment_terms_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    /// Used when neither the `locale` cookie nor `Accept-Language` match
    pub default: Locale,
}

impl WebConfig {
    /// Loads configuration from the file, the environment and the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("STITCH").separator("__"));

        Self::from_builder(builder)
    }

    /// Applies defaults to `builder`, deserializes and validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: WebConfig = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "./data/stitch.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.audience", "authenticated")?
            .set_default("billing.currency", "USD")?
            .set_default("billing.payment_terms_days", 14)?
            .set_default("locale.default", "en")?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }

        if self.billing.payment_terms_days < 0 {
            return Err(ConfigError::InvalidValue("billing.payment_terms_days".to_string()));
        }

        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("server.host".to_string()))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
