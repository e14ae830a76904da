//! Configuration for faculty-core
//!
//! Layered as defaults, then an optional TOML file, then environment
//! variables (`FACULTY_DATABASE_URL`, `FACULTY_JWT__SECRET`,
//! `FACULTY_JWT__TTL_SECONDS`, ...). List keys take comma separated values,
//! e.g. `FACULTY_POLICY__ADMIN_PREFIXES=/api/admin,/api/manage`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::jwt::TokenConfig;

/// Default config file looked up next to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "faculty.toml";

const ENV_PREFIX: &str = "FACULTY";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub api_bind_address: String,
    pub jwt: TokenConfig,
    pub password: PasswordConfig,
    pub cors: CorsSettings,
    pub policy: PolicySettings,
}

/// Password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub argon2_memory_cost: u32,
    pub argon2_time_cost: u32,
    pub argon2_parallelism: u32,
}

/// Cross-origin settings for the browser frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub max_age_seconds: u64,
}

/// Route classification settings for the authorization gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Path prefixes reserved to administrators and department heads
    pub admin_prefixes: Vec<String>,
    /// Extra public path prefixes on top of the built-in allow-list
    pub public_prefixes: Vec<String>,
}

impl AppConfig {
    /// Load configuration from `faculty.toml` (if present) and the environment
    pub fn from_env() -> crate::Result<Self> {
        let path = std::env::var("FACULTY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(Some(Path::new(&path)))
    }

    /// Load configuration, optionally layering a config file over the defaults
    pub fn load(file: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("policy.admin_prefixes")
                    .with_list_parse_key("policy.public_prefixes"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://faculty.db?mode=rwc".to_string(),
            api_bind_address: "127.0.0.1:8080".to_string(),
            jwt: TokenConfig::default(),
            password: PasswordConfig::default(),
            cors: CorsSettings::default(),
            policy: PolicySettings::default(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:8443".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            max_age_seconds: 3600,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            admin_prefixes: vec!["/api/admin".to_string()],
            public_prefixes: Vec::new(),
        }
    }
}
