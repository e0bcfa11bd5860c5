use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::auth::JwtConfig;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/marquee";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_JWT_EXPIRY_MINS: i64 = 60;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const DEV_JWT_SECRET: &str = "marquee-dev-jwt-secret";
const DEV_QR_SECRET: &str = "marquee-dev-qr-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: String,
    pub jwt: JwtConfig,
    pub qr_secret: String,
    pub seed_on_start: bool,
    /// `RUST_ENV=production`: enables HSTS and requires real secrets.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            storage: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            jwt: JwtConfig {
                secret: secret(&lookup, "JWT_SECRET", DEV_JWT_SECRET, production)?,
                expiry_mins: parse_or(&lookup, "JWT_EXPIRY_MINS", DEFAULT_JWT_EXPIRY_MINS)?,
            },
            qr_secret: secret(&lookup, "QR_SECRET", DEV_QR_SECRET, production)?,
            seed_on_start: parse_or(&lookup, "SEED_ON_START", false)?,
            production,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn secret(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    dev_default: &str,
    production: bool,
) -> Result<String, ConfigError> {
    match lookup(var).filter(|v| !v.is_empty()) {
        Some(value) => Ok(value),
        None if production => Err(ConfigError::Missing(var)),
        None => {
            tracing::warn!("{var} not set, using development default");
            Ok(dev_default.to_string())
        }
    }
}
