//! Elo rating model for team games
//!
//! Teams are compared by their aggregate (summed) rating. Ratings are never
//! clamped, so they may drift below zero or grow without bound.

use crate::config::RatingConfig;
use serde::{Deserialize, Serialize};

/// Outcome value of a win
pub const WIN: f64 = 1.0;
/// Outcome value of a loss
pub const LOSS: f64 = 0.0;

/// Probability that a side rated `rating_a` beats a side rated `rating_b`
pub fn expected(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0))
}

/// Rating change for an `actual` outcome (1 win, 0 loss) given the expectation
pub fn delta(expected_prob: f64, actual: f64, k: f64) -> f64 {
    k * (actual - expected_prob)
}

/// What each side stands to gain or lose in a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchStakes {
    pub blue_win: f64,
    pub blue_loss: f64,
    pub red_win: f64,
    pub red_loss: f64,
}

/// Elo calculator bound to a K factor and an initial rating
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: RatingConfig,
}

impl EloCalculator {
    /// Create a new Elo calculator
    pub fn new(config: RatingConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Rating given to new participants
    pub fn initial_rating(&self) -> f64 {
        self.config.initial_rating
    }

    pub fn k_factor(&self) -> f64 {
        self.config.k_factor
    }

    pub fn expected(&self, rating_a: f64, rating_b: f64) -> f64 {
        expected(rating_a, rating_b)
    }

    pub fn delta(&self, expected_prob: f64, actual: f64) -> f64 {
        delta(expected_prob, actual, self.config.k_factor)
    }

    /// Possible deltas for both sides given blue's win probability
    pub fn stakes(&self, expected_blue_win: f64) -> MatchStakes {
        let expected_red_win = 1.0 - expected_blue_win;
        MatchStakes {
            blue_win: self.delta(expected_blue_win, WIN),
            blue_loss: self.delta(expected_blue_win, LOSS),
            red_win: self.delta(expected_red_win, WIN),
            red_loss: self.delta(expected_red_win, LOSS),
        }
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: RatingConfig::default(),
        }
    }
}
