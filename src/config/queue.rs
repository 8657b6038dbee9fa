//! Queue and team composition configuration

use crate::types::{MatchmakingMode, MATCH_SIZE};
use serde::{Deserialize, Serialize};

/// How the queue is turned into matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Objective used when the session starts
    pub mode: MatchmakingMode,
    /// Whether role preferences constrain team composition
    pub role_aware: bool,
    /// How many of the oldest queue entries are searched for a role-valid pool
    pub max_candidate_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: MatchmakingMode::Balanced,
            role_aware: true,
            max_candidate_window: 12,
        }
    }
}

impl QueueConfig {
    /// Configuration without role constraints (fill for everyone)
    pub fn legacy() -> Self {
        Self {
            role_aware: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_candidate_window < MATCH_SIZE {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: format!(
                    "Candidate window must hold at least {} entries, got {}",
                    MATCH_SIZE, self.max_candidate_window
                ),
            }
            .into());
        }

        // C(14, 10) pools is the most we are willing to enumerate per join
        if self.max_candidate_window > 14 {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: format!(
                    "Candidate window of {} is too large (max 14)",
                    self.max_candidate_window
                ),
            }
            .into());
        }

        Ok(())
    }
}
