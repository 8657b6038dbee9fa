//! Rating system configuration

use serde::{Deserialize, Serialize};

/// Elo parameters shared by the rating model and the rating store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Rating given to a participant on first appearance
    pub initial_rating: f64,
    /// Maximum rating change for a single result
    pub k_factor: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1200.0,
            k_factor: 100.0,
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.initial_rating.is_finite() {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: "Initial rating must be finite".to_string(),
            }
            .into());
        }

        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: "K factor must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
