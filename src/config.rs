//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: TOURBOOK_)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/tourbook/config.toml
//! 4. System directory: /etc/tourbook/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Query-string handling configuration
    pub query: QueryConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Password reset token lifetime in seconds
    #[serde(default = "default_reset_token_ttl")]
    pub reset_token_ttl_secs: u64,

    /// Minimum accepted password length
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

/// Query-string handling configuration
///
/// The reserved parameter names and the default sort are deliberately
/// configuration rather than literals baked into the query builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Parameter names that control presentation rather than filtering
    #[serde(default = "default_reserved_params")]
    pub reserved_params: Vec<String>,

    /// Sort specification applied when the client supplies none
    #[serde(default = "default_sort")]
    pub default_sort: String,

    /// Page size applied when the client supplies none
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Upper bound on the page size a client may request
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_service_name() -> String {
    "tourbook".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_jwt_secret() -> String {
    // Development fallback only; override in any deployed environment.
    "insecure-dev-secret".to_string()
}

fn default_token_ttl() -> u64 {
    // 90 days
    90 * 24 * 60 * 60
}

fn default_reset_token_ttl() -> u64 {
    // 10 minutes
    10 * 60
}

fn default_min_password_length() -> usize {
    8
}

fn default_reserved_params() -> Vec<String> {
    ["page", "sort", "limit", "fields"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_sort() -> String {
    "-created_at".to_string()
}

fn default_limit() -> u64 {
    100
}

fn default_max_limit() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_service_name(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            auth: AuthConfig {
                jwt_secret: default_jwt_secret(),
                token_ttl_secs: default_token_ttl(),
                reset_token_ttl_secs: default_reset_token_ttl(),
                min_password_length: default_min_password_length(),
            },
            query: QueryConfig {
                reserved_params: default_reserved_params(),
                default_sort: default_sort(),
                default_limit: default_limit(),
                max_limit: default_max_limit(),
            },
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in Self::config_paths() {
            if path.exists() {
                tracing::debug!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        // Environment variables have highest priority
        figment = figment.merge(Env::prefixed("TOURBOOK_").split("_"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TOURBOOK_").split("_"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config file locations, lowest precedence first
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/tourbook/config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("tourbook");
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("config.toml"));
        paths
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Whether the service runs in the production posture
    pub fn is_production(&self) -> bool {
        self.service.environment == "production"
    }
}
