//! Main application configuration
//!
//! This module defines the primary configuration structures for the inhouse
//! matchmaking bot, including file and environment variable loading and validation.

use crate::config::{QueueConfig, RatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub rating: RatingConfig,
    pub queue: QueueConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check endpoint
    pub health_port: u16,
    /// Whether the health/metrics HTTP server is started
    pub health_enabled: bool,
}

/// Rating store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite connection URL, e.g. `sqlite://inhouse.db` or `sqlite::memory:`
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "inhouse".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            health_enabled: true,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://inhouse.db".to_string(),
            max_connections: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(enabled) = env::var("HEALTH_ENABLED") {
            config.service.health_enabled = enabled
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_ENABLED value: {}", enabled))?;
        }

        // Storage settings
        if let Ok(url) = env::var("DATABASE_URL") {
            config.storage.database_url = url;
        }
        if let Ok(max) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.storage.max_connections = max
                .parse()
                .map_err(|_| anyhow!("Invalid DATABASE_MAX_CONNECTIONS value: {}", max))?;
        }

        // Rating settings
        if let Ok(initial) = env::var("INITIAL_RATING") {
            config.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }
        if let Ok(k) = env::var("K_FACTOR") {
            config.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid K_FACTOR value: {}", k))?;
        }

        // Queue settings
        if let Ok(mode) = env::var("MATCHMAKING_MODE") {
            config.queue.mode = mode.parse()?;
        }
        if let Ok(role_aware) = env::var("ROLE_AWARE") {
            config.queue.role_aware = role_aware
                .parse()
                .map_err(|_| anyhow!("Invalid ROLE_AWARE value: {}", role_aware))?;
        }
        if let Ok(window) = env::var("MAX_CANDIDATE_WINDOW") {
            config.queue.max_candidate_window = window
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_CANDIDATE_WINDOW value: {}", window))?;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.health_enabled && config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }

    // Validate storage settings
    if config.storage.database_url.is_empty() {
        return Err(anyhow!("Database URL cannot be empty"));
    }
    if !config.storage.database_url.starts_with("sqlite:") {
        return Err(anyhow!(
            "Only sqlite database URLs are supported: {}",
            config.storage.database_url
        ));
    }
    if config.storage.max_connections == 0 {
        return Err(anyhow!("Database max connections must be greater than 0"));
    }

    config.rating.validate()?;
    config.queue.validate()?;

    Ok(())
}
