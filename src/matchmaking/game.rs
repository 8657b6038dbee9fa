//! Match records and result application
//!
//! A [`MatchRecord`] is created once teams are fixed and never changes
//! afterwards. Applying a result pushes all ten rating updates to the store
//! as a single batch.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::composer::TeamSplit;
use crate::rating::{EloCalculator, MatchStakes, RatingStore, RatingUpdate};
use crate::types::{MatchId, MatchmakingMode, ParticipantId, Side, Team, TEAM_SIZE};
use crate::utils::{current_timestamp, generate_match_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Snapshot of a created match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub created_at: DateTime<Utc>,
    pub mode: MatchmakingMode,
    pub blue: Team,
    pub red: Team,
    /// Probability that blue wins, from aggregate or average team ratings
    pub expected_blue_win: f64,
    pub stakes: MatchStakes,
    k_factor: f64,
}

/// What applying a result changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub winner: Side,
    /// Delta given to every blue member; red members receive the negation
    pub blue_delta: f64,
    pub updates: Vec<RatingUpdate>,
}

impl MatchOutcome {
    pub fn red_delta(&self) -> f64 {
        -self.blue_delta
    }
}

impl MatchRecord {
    /// Create a match from two teams of five distinct participants
    pub fn new(
        blue: Team,
        red: Team,
        mode: MatchmakingMode,
        calculator: &EloCalculator,
    ) -> Result<Self> {
        let expected_blue_win = calculator.expected(blue.aggregate_rating, red.aggregate_rating);
        Self::with_expectation(blue, red, mode, calculator, expected_blue_win)
    }

    /// Create a match priced on average member ratings instead of sums.
    /// Used for games recorded by hand.
    pub fn from_averages(
        blue: Team,
        red: Team,
        mode: MatchmakingMode,
        calculator: &EloCalculator,
    ) -> Result<Self> {
        let expected_blue_win = calculator.expected(blue.average_rating(), red.average_rating());
        Self::with_expectation(blue, red, mode, calculator, expected_blue_win)
    }

    fn with_expectation(
        blue: Team,
        red: Team,
        mode: MatchmakingMode,
        calculator: &EloCalculator,
        expected_blue_win: f64,
    ) -> Result<Self> {
        validate_teams(&blue, &red)?;
        let stakes = calculator.stakes(expected_blue_win);

        Ok(Self {
            id: generate_match_id(),
            created_at: current_timestamp(),
            mode,
            blue,
            red,
            expected_blue_win,
            stakes,
            k_factor: calculator.k_factor(),
        })
    }

    pub fn from_split(
        split: TeamSplit,
        mode: MatchmakingMode,
        calculator: &EloCalculator,
    ) -> Result<Self> {
        Self::new(split.blue, split.red, mode, calculator)
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.side_of(participant_id).is_some()
    }

    pub fn side_of(&self, participant_id: &str) -> Option<Side> {
        if self.blue.contains(participant_id) {
            Some(Side::Blue)
        } else if self.red.contains(participant_id) {
            Some(Side::Red)
        } else {
            None
        }
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.blue.ids().chain(self.red.ids()).cloned().collect()
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }

    /// Blue's delta for the given result
    pub fn blue_delta(&self, blue_won: bool) -> f64 {
        let actual = if blue_won {
            crate::rating::elo::WIN
        } else {
            crate::rating::elo::LOSS
        };
        crate::rating::elo::delta(self.expected_blue_win, actual, self.k_factor)
    }

    /// Rating updates for every participant.
    ///
    /// A side is credited with a win when its own delta is strictly positive,
    /// independently of which side was reported as the winner. A zero delta
    /// therefore counts as a loss for both sides.
    pub fn rating_updates(&self, blue_won: bool) -> (f64, Vec<RatingUpdate>) {
        let blue_delta = self.blue_delta(blue_won);
        let red_delta = -blue_delta;

        let updates = self
            .blue
            .ids()
            .map(|id| (id, blue_delta))
            .chain(self.red.ids().map(|id| (id, red_delta)))
            .map(|(id, delta)| RatingUpdate {
                participant_id: id.clone(),
                delta,
                won: delta > 0.0,
            })
            .collect();

        (blue_delta, updates)
    }

    /// Apply the result to the store as one atomic batch.
    ///
    /// Callers must apply a match at most once.
    pub async fn apply_result(&self, blue_won: bool, store: &dyn RatingStore) -> Result<MatchOutcome> {
        let (blue_delta, updates) = self.rating_updates(blue_won);
        debug!(
            "Applying result for match {}: blue_won={}, delta={:.2}",
            self.id, blue_won, blue_delta
        );

        store.apply_deltas(&updates).await?;

        let winner = if blue_won { Side::Blue } else { Side::Red };
        info!(
            "Match {} resolved: winner: {}, blue {:+.1}, red {:+.1}",
            self.id, winner, blue_delta, -blue_delta
        );

        Ok(MatchOutcome {
            match_id: self.id,
            winner,
            blue_delta,
            updates,
        })
    }
}

fn validate_teams(blue: &Team, red: &Team) -> Result<()> {
    for (side, team) in [(Side::Blue, blue), (Side::Red, red)] {
        if team.members.len() != TEAM_SIZE {
            return Err(MatchmakingError::InvalidTeam {
                reason: format!(
                    "{} team has {} members, expected {}",
                    side,
                    team.members.len(),
                    TEAM_SIZE
                ),
            }
            .into());
        }
    }

    let mut seen = HashSet::new();
    for id in blue.ids().chain(red.ids()) {
        if !seen.insert(id) {
            return Err(MatchmakingError::InvalidTeam {
                reason: format!("{} appears more than once", id),
            }
            .into());
        }
    }

    Ok(())
}
