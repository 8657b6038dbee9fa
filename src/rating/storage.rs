//! Rating storage interface and implementations
//!
//! This module defines the interface for persisting and retrieving participant
//! ratings and win/loss records, with an in-memory implementation. The durable
//! SQLite implementation lives in [`crate::rating::sqlite`].

use crate::error::{MatchmakingError, Result};
use crate::types::{ParticipantId, Record};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One rating adjustment produced by a match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub participant_id: ParticipantId,
    pub delta: f64,
    /// Increments wins when true, losses otherwise
    pub won: bool,
}

/// Stored state of a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub participant_id: ParticipantId,
    pub rating: f64,
    pub record: Record,
}

impl RatingRow {
    /// Create the default row for a new participant
    pub fn new(participant_id: ParticipantId, initial_rating: f64) -> Self {
        Self {
            participant_id,
            rating: initial_rating,
            record: Record::default(),
        }
    }

    /// Add a delta and count the game
    pub fn apply(&mut self, delta: f64, won: bool) {
        self.rating += delta;
        if won {
            self.record.wins += 1;
        } else {
            self.record.losses += 1;
        }
    }
}

/// Trait for rating storage operations
///
/// Every participant identity owns at most one row; rows are never deleted.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current rating, or the initial rating when the participant is unknown.
    /// Never creates a row.
    async fn get_rating(&self, participant_id: &str) -> Result<f64>;

    /// Insert the default row if none exists; returns whether a row was created
    async fn ensure_participant(&self, participant_id: &str) -> Result<bool>;

    /// Add `delta` to the rating and count a win or a loss
    async fn apply_delta(&self, participant_id: &str, delta: f64, won: bool) -> Result<()>;

    /// Apply several updates as one all-or-nothing unit
    async fn apply_deltas(&self, updates: &[RatingUpdate]) -> Result<()>;

    /// Every stored (participant, rating) pair
    async fn all_ratings(&self) -> Result<Vec<(ParticipantId, f64)>>;

    /// Win/loss record, or `None` for an unknown participant
    async fn get_record(&self, participant_id: &str) -> Result<Option<Record>>;
}

/// Reject updates that would poison stored ratings
pub(crate) fn validate_updates(updates: &[RatingUpdate]) -> Result<()> {
    for update in updates {
        if !update.delta.is_finite() {
            return Err(MatchmakingError::StorageError {
                message: format!(
                    "Refusing non-finite rating delta {} for {}",
                    update.delta, update.participant_id
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// In-memory rating storage implementation
#[derive(Debug)]
pub struct InMemoryRatingStore {
    rows: RwLock<HashMap<ParticipantId, RatingRow>>,
    initial_rating: f64,
}

impl InMemoryRatingStore {
    /// Create a new in-memory rating store
    pub fn new(initial_rating: f64) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            initial_rating,
        }
    }

    /// Preset ratings (for testing and seeding)
    pub fn with_ratings<I, S>(initial_rating: f64, ratings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<ParticipantId>,
    {
        let rows = ratings
            .into_iter()
            .map(|(id, rating)| {
                let id = id.into();
                (id.clone(), RatingRow::new(id, rating))
            })
            .collect();

        Self {
            rows: RwLock::new(rows),
            initial_rating,
        }
    }

    fn lock_error(kind: &str) -> MatchmakingError {
        MatchmakingError::InternalError {
            message: format!("Failed to acquire ratings {} lock", kind),
        }
    }
}

impl Default for InMemoryRatingStore {
    fn default() -> Self {
        Self::new(crate::config::RatingConfig::default().initial_rating)
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn get_rating(&self, participant_id: &str) -> Result<f64> {
        let rows = self.rows.read().map_err(|_| Self::lock_error("read"))?;

        Ok(rows
            .get(participant_id)
            .map(|row| row.rating)
            .unwrap_or(self.initial_rating))
    }

    async fn ensure_participant(&self, participant_id: &str) -> Result<bool> {
        let mut rows = self.rows.write().map_err(|_| Self::lock_error("write"))?;

        if rows.contains_key(participant_id) {
            return Ok(false);
        }
        rows.insert(
            participant_id.to_string(),
            RatingRow::new(participant_id.to_string(), self.initial_rating),
        );
        Ok(true)
    }

    async fn apply_delta(&self, participant_id: &str, delta: f64, won: bool) -> Result<()> {
        self.apply_deltas(&[RatingUpdate {
            participant_id: participant_id.to_string(),
            delta,
            won,
        }])
        .await
    }

    async fn apply_deltas(&self, updates: &[RatingUpdate]) -> Result<()> {
        validate_updates(updates)?;

        // One write lock for the whole batch keeps it atomic
        let mut rows = self.rows.write().map_err(|_| Self::lock_error("write"))?;
        for update in updates {
            rows.entry(update.participant_id.clone())
                .or_insert_with(|| {
                    RatingRow::new(update.participant_id.clone(), self.initial_rating)
                })
                .apply(update.delta, update.won);
        }

        Ok(())
    }

    async fn all_ratings(&self) -> Result<Vec<(ParticipantId, f64)>> {
        let rows = self.rows.read().map_err(|_| Self::lock_error("read"))?;

        let mut ratings: Vec<(ParticipantId, f64)> = rows
            .values()
            .map(|row| (row.participant_id.clone(), row.rating))
            .collect();
        ratings.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ratings)
    }

    async fn get_record(&self, participant_id: &str) -> Result<Option<Record>> {
        let rows = self.rows.read().map_err(|_| Self::lock_error("read"))?;

        Ok(rows.get(participant_id).map(|row| row.record))
    }
}
