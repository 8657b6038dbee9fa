//! Main application state and service coordination
//!
//! `AppState` wires the rating store, the session, metrics and the health
//! server together and owns their background tasks.

use crate::config::AppConfig;
use crate::matchmaking::Session;
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector, MetricsService};
use crate::rating::{RatingStore, SqliteRatingStore};
use crate::service::health::HealthCheck;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage initialization error: {message}")]
    Storage { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// The community's matchmaking state, one command at a time
    session: Arc<Mutex<Session>>,

    metrics_service: Arc<MetricsService>,

    background_tasks: Vec<JoinHandle<()>>,

    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application, opening the configured SQLite store
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} in-house service", config.service.name);
        info!("Rating store: {}", config.storage.database_url);

        let store = SqliteRatingStore::connect(&config.storage, config.rating.initial_rating)
            .await
            .map_err(|e| ServiceError::Storage {
                message: format!("Failed to open rating store: {:#}", e),
            })?;

        Self::with_store(config, Arc::new(store))
    }

    /// Initialize the application around an existing store
    pub fn with_store(config: AppConfig, store: Arc<dyn RatingStore>) -> Result<Self, ServiceError> {
        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let session = Session::from_config(&config, store)
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create session: {}", e),
            })?
            .with_metrics(metrics_collector.clone());
        let session = Arc::new(Mutex::new(session));

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };
        let health_server = Arc::new(
            HealthServer::new(
                health_config,
                config.service.name.clone(),
                metrics_collector.clone(),
            )
            .with_session(session.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(metrics_collector, health_server));

        info!(
            "Session ready - mode: {}, role aware: {}, K: {}",
            config.queue.mode, config.queue.role_aware, config.rating.k_factor
        );

        Ok(Self {
            config,
            session,
            metrics_service,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the health server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);
        *self.is_running.write().await = true;

        if self.config.service.health_enabled {
            self.start_metrics_service();
        } else {
            info!("Health server disabled");
        }
        self.start_background_tasks();

        info!("✅ {} service started", self.config.service.name);
        Ok(())
    }

    /// Stop background tasks and the health server
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);
        *self.is_running.write().await = false;

        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        }

        let task_count = self.background_tasks.len();
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        let session = self.session.lock().await;
        info!(
            "Final state - queued: {}, active matches: {}",
            session.queue().len(),
            session.active_matches().len()
        );
        info!("✅ {} shutdown completed", self.config.service.name);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Run a health check against the live session
    pub async fn health(&self) -> HealthCheck {
        HealthCheck::check(&self.config.service.name, &self.session).await
    }

    fn start_metrics_service(&mut self) {
        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {:#}", e);
            }
        });
        self.background_tasks.push(handle);

        info!("Metrics and health endpoints on port {}", port);
    }

    fn start_background_tasks(&mut self) {
        let metrics_collector = self.metrics_service.collector();
        let session = self.session.clone();
        let service_name = self.config.service.name.clone();
        let is_running = self.is_running.clone();

        let health_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            let start_time = tokio::time::Instant::now();

            while *is_running.read().await {
                interval.tick().await;

                metrics_collector
                    .service()
                    .uptime_seconds
                    .set(start_time.elapsed().as_secs() as i64);

                let health = HealthCheck::check(&service_name, &session).await;
                metrics_collector.update_health_status(health.status.as_gauge());
                debug!(
                    "Health: {} - queued: {}, active matches: {}, participants: {}",
                    health.status,
                    health.stats.queued,
                    health.stats.active_matches,
                    health.stats.participants
                );
            }
        });
        self.background_tasks.push(health_task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::InMemoryRatingStore;
    use crate::service::health::HealthStatus;
    use crate::types::RolePreference;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.health_enabled = false;
        config
    }

    #[tokio::test]
    async fn test_with_store_wires_session() {
        let app = AppState::with_store(config(), Arc::new(InMemoryRatingStore::default())).unwrap();

        app.session()
            .lock()
            .await
            .join("a", RolePreference::fill())
            .await
            .unwrap();

        let health = app.health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.stats.queued, 1);
        assert_eq!(
            app.metrics_service().collector().queue().joins_total.get(),
            1
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mut config = config();
        config.rating.k_factor = -1.0;

        let result = AppState::with_store(config, Arc::new(InMemoryRatingStore::default()));
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut app =
            AppState::with_store(config(), Arc::new(InMemoryRatingStore::default())).unwrap();

        app.start().await.unwrap();
        assert!(app.is_running().await);

        app.shutdown().await.unwrap();
        assert!(!app.is_running().await);
    }

    #[tokio::test]
    async fn test_new_opens_sqlite() {
        let mut config = config();
        config.storage.database_url = "sqlite::memory:".to_string();

        let app = AppState::new(config).await.unwrap();
        assert_eq!(app.health().await.status, HealthStatus::Healthy);
    }
}
