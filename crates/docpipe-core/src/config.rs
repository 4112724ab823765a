//! Configuration module
//!
//! Application configuration loaded from the environment (with `.env`
//! support via dotenvy). Defaults are suitable for local development; the
//! JWT secret must be provided explicitly.

use std::env;
use std::path::PathBuf;

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_MAX_CHUNK_SIZE_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_LIST_LIMIT_CAP: i64 = 250;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 10;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    /// Root directory for per-upload chunk staging.
    pub chunk_dir: PathBuf,
    /// Root directory for merged document files.
    pub files_dir: PathBuf,
    /// Upper bound on a single uploaded chunk.
    pub max_chunk_size_bytes: usize,
    /// Hard cap applied to the document list `limit` parameter.
    pub list_limit_cap: i64,
    /// Base URL of the external analysis service.
    pub analysis_base_url: String,
    /// Request timeout for outbound analysis calls; no response within this
    /// window is treated as a transport failure.
    pub analysis_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; ignore if missing
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        Ok(AppConfig {
            server_port: env_parse("PORT", DEFAULT_SERVER_PORT),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/docpipe".to_string()),
            chunk_dir: PathBuf::from(env::var("CHUNK_DIR").unwrap_or_else(|_| "chunk".to_string())),
            files_dir: PathBuf::from(env::var("FILES_DIR").unwrap_or_else(|_| "files".to_string())),
            max_chunk_size_bytes: env_parse("MAX_CHUNK_SIZE_BYTES", DEFAULT_MAX_CHUNK_SIZE_BYTES),
            list_limit_cap: env_parse("LIST_LIMIT_CAP", DEFAULT_LIST_LIMIT_CAP),
            analysis_base_url: env::var("ANALYSIS_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5678".to_string()),
            analysis_timeout_secs: env_parse("ANALYSIS_TIMEOUT_SECS", DEFAULT_ANALYSIS_TIMEOUT_SECS),
            jwt_secret,
            jwt_expiry_hours: env_parse("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
