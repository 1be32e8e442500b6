//! Configuration management for StudyDrop Server

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: Option<StorageConfig>,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: None,
            database: DatabaseConfig {
                url: "sqlite:./studydrop.db".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                jwt_secret: "studydrop-dev-secret".to_string(),
                token_ttl_hours: 24 * 7,
            },
            uploads: UploadConfig {
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                signed_url_ttl_secs: 3600,
            },
            ai: AiConfig {
                gemini_api_key: None,
                gemini_model: "gemini-1.5-flash".to_string(),
                gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
        }
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("S3_ENDPOINT is set but {0} is missing")]
    IncompleteStorage(&'static str),
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source; unset optional values take
    /// their defaults, while a missing secret or partial storage block fails
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        // Storage is optional; without an endpoint files are kept in memory
        let storage = match var("S3_ENDPOINT") {
            Some(endpoint) => {
                let required = |name: &'static str| {
                    var(name).ok_or(ConfigError::IncompleteStorage(name))
                };
                Some(StorageConfig {
                    endpoint,
                    bucket: required("S3_BUCKET")?,
                    access_key: required("S3_ACCESS_KEY")?,
                    secret_key: required("S3_SECRET_KEY")?,
                    region: var("S3_REGION"),
                })
            }
            None => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed(var("SERVER_PORT")).unwrap_or(defaults.server.port),
            },
            storage,
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parsed(var("DATABASE_MAX_CONNECTIONS"))
                    .unwrap_or(defaults.database.max_connections),
            },
            auth: AuthConfig {
                jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
                token_ttl_hours: parsed(var("JWT_TTL_HOURS")).unwrap_or(defaults.auth.token_ttl_hours),
            },
            uploads: UploadConfig {
                max_bytes: parsed(var("MAX_UPLOAD_BYTES")).unwrap_or(defaults.uploads.max_bytes),
                signed_url_ttl_secs: parsed(var("SIGNED_URL_TTL_SECS"))
                    .unwrap_or(defaults.uploads.signed_url_ttl_secs),
            },
            ai: AiConfig {
                gemini_api_key: var("GEMINI_API_KEY"),
                gemini_model: var("GEMINI_MODEL").unwrap_or(defaults.ai.gemini_model),
                gemini_base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.ai.gemini_base_url),
            },
        })
    }
}

fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}
