//! Health checks for the in-house service
//!
//! The session and the rating store are the only components; a check probes
//! both and reports queue and match counts alongside.

use crate::matchmaking::Session;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported on the health gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Set when the component is not healthy
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Counts reported with every health check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub queued: usize,
    pub active_matches: usize,
    /// Participants with a stored rating
    pub participants: usize,
}

impl HealthCheck {
    /// Probe the session and its rating store
    pub async fn check(service: &str, session: &Mutex<Session>) -> Self {
        let mut checks = Vec::new();
        let mut stats = ServiceStats::default();

        let start = Instant::now();
        let store = match session.try_lock() {
            Ok(session) => {
                stats.queued = session.queue().len();
                stats.active_matches = session.active_matches().len();
                checks.push(component("session", HealthStatus::Healthy, None, start));
                Some(session.store())
            }
            Err(_) => {
                debug!("Session busy during health check");
                checks.push(component(
                    "session",
                    HealthStatus::Degraded,
                    Some("session is busy".to_string()),
                    start,
                ));
                None
            }
        };

        if let Some(store) = store {
            let start = Instant::now();
            match store.all_ratings().await {
                Ok(ratings) => {
                    stats.participants = ratings.len();
                    checks.push(component("rating_store", HealthStatus::Healthy, None, start));
                }
                Err(e) => {
                    error!("Rating store health check failed: {}", e);
                    checks.push(component(
                        "rating_store",
                        HealthStatus::Unhealthy,
                        Some(e.to_string()),
                        start,
                    ));
                }
            }
        }

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |status, check| status.worst(check.status));

        HealthCheck {
            status,
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

fn component(
    name: &str,
    status: HealthStatus,
    message: Option<String>,
    start: Instant,
) -> ComponentCheck {
    ComponentCheck {
        name: name.to_string(),
        status,
        message,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
