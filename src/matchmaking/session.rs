//! Per-community matchmaking session
//!
//! A [`Session`] owns the queue and the matches waiting for a result. The
//! chat layer drives it one command at a time and renders the plain-data
//! reports it returns.

use crate::config::AppConfig;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::composer::{CompositionResult, InfeasibleReason, TeamComposer};
use crate::matchmaking::game::{MatchOutcome, MatchRecord};
use crate::matchmaking::queue::{MatchQueue, QueueEntry};
use crate::metrics::MetricsCollector;
use crate::ranks::{rank_changes, RankChange, RankClassifier, RankMap, Tier};
use crate::rating::{EloCalculator, RatingStore};
use crate::types::{
    Candidate, LeaderboardEntry, MatchmakingMode, ParticipantId, Record, RolePreference, Side,
    Team, MATCH_SIZE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Queue contents after a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    /// Entries needed before composition is attempted
    pub needed: usize,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn participant_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.participant_id.as_str())
            .collect()
    }
}

/// What happened when the queue was checked for a match
#[derive(Debug, Clone, PartialEq)]
pub enum MatchAttempt {
    /// Fewer than ten participants queued
    NotReady { queued: usize, needed: usize },
    /// Teams were formed; the participants left the queue
    Created(Box<MatchRecord>),
    /// Enough participants but no valid split; the queue is unchanged
    Infeasible(InfeasibleReason),
}

/// Result of a join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinReport {
    pub participant_id: ParticipantId,
    /// Whether this was the participant's first appearance
    pub registered: bool,
    pub attempt: MatchAttempt,
    pub queue: QueueSnapshot,
}

/// Result of a leave
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveReport {
    /// The entry is gone; the remaining queue was checked for a match again
    Left {
        attempt: MatchAttempt,
        queue: QueueSnapshot,
    },
    NotQueued,
}

/// Result of a toggle
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleReport {
    Joined(JoinReport),
    Left(LeaveReport),
}

/// Result of an applied match
#[derive(Debug, Clone, PartialEq)]
pub struct ResultReport {
    pub record: MatchRecord,
    pub outcome: MatchOutcome,
    pub rank_changes: Vec<RankChange>,
}

/// Result of a void
#[derive(Debug, Clone, PartialEq)]
pub struct VoidReport {
    /// The dropped match, if the reporter was in one
    pub voided: Option<MatchRecord>,
    /// Queue entries removed
    pub cleared: usize,
}

/// Matchmaking state of one community
pub struct Session {
    queue: MatchQueue,
    active: Vec<MatchRecord>,
    mode: MatchmakingMode,
    composer: TeamComposer,
    calculator: EloCalculator,
    classifier: RankClassifier,
    store: Arc<dyn RatingStore>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Session {
    pub fn new(
        store: Arc<dyn RatingStore>,
        calculator: EloCalculator,
        composer: TeamComposer,
        mode: MatchmakingMode,
    ) -> Self {
        Self {
            queue: MatchQueue::new(),
            active: Vec::new(),
            mode,
            composer,
            calculator,
            classifier: RankClassifier::default_ladder(),
            store,
            metrics: None,
        }
    }

    /// Build a session from validated configuration
    pub fn from_config(config: &AppConfig, store: Arc<dyn RatingStore>) -> Result<Self> {
        let calculator = EloCalculator::new(config.rating.clone())?;
        config.queue.validate()?;
        let composer = TeamComposer::new(&config.queue);

        Ok(Self::new(store, calculator, composer, config.queue.mode))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_classifier(mut self, classifier: RankClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> Arc<dyn RatingStore> {
        self.store.clone()
    }

    pub fn mode(&self) -> MatchmakingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MatchmakingMode) {
        if self.mode != mode {
            info!("Matchmaking mode changed: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn queue(&self) -> QueueSnapshot {
        QueueSnapshot {
            entries: self.queue.entries().cloned().collect(),
            needed: MATCH_SIZE,
        }
    }

    pub fn active_matches(&self) -> &[MatchRecord] {
        &self.active
    }

    /// The active match a participant is playing in
    pub fn match_of(&self, participant_id: &str) -> Option<&MatchRecord> {
        self.active.iter().find(|m| m.contains(participant_id))
    }

    /// Add a participant to the queue and try to form a match
    pub async fn join(&mut self, participant_id: &str, roles: RolePreference) -> Result<JoinReport> {
        if self.match_of(participant_id).is_some() {
            self.record_rejected("already_in_match");
            return Err(MatchmakingError::AlreadyInMatch {
                participant_id: participant_id.to_string(),
            }
            .into());
        }
        if self.queue.contains(participant_id) {
            self.record_rejected("already_queued");
            return Err(MatchmakingError::AlreadyQueued {
                participant_id: participant_id.to_string(),
            }
            .into());
        }

        let registered = self
            .store
            .ensure_participant(participant_id)
            .await
            .inspect_err(|_| self.record_storage_error("ensure_participant"))?;
        if registered {
            info!("Registered new participant: {}", participant_id);
        }

        self.queue
            .push(QueueEntry::new(participant_id.to_string(), roles.clone()))?;
        info!(
            "Participant joined queue - id: {}, roles: {}, queued: {}/{}",
            participant_id,
            roles,
            self.queue.len(),
            MATCH_SIZE
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_join(self.queue.len());
        }

        // A join whose composition errored does not stand; the registration does
        let attempt = match self.try_create_match().await {
            Ok(attempt) => attempt,
            Err(e) => {
                self.queue.remove(participant_id);
                warn!(
                    "Join of {} rolled back, composition failed: {}",
                    participant_id, e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.set_queue_length(self.queue.len());
                }
                return Err(e);
            }
        };

        Ok(JoinReport {
            participant_id: participant_id.to_string(),
            registered,
            attempt,
            queue: self.queue(),
        })
    }

    /// Remove a participant from the queue.
    ///
    /// Removing an entry can unblock a role-aware queue, so composition is
    /// attempted again whenever ten or more entries remain.
    pub async fn leave(&mut self, participant_id: &str) -> Result<LeaveReport> {
        if self.queue.remove(participant_id).is_none() {
            debug!("Leave ignored, {} is not queued", participant_id);
            return Ok(LeaveReport::NotQueued);
        }

        info!(
            "Participant left queue - id: {}, queued: {}/{}",
            participant_id,
            self.queue.len(),
            MATCH_SIZE
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_leave(self.queue.len());
        }

        let attempt = self.try_create_match().await?;
        Ok(LeaveReport::Left {
            attempt,
            queue: self.queue(),
        })
    }

    /// Join when not queued, leave when queued
    pub async fn toggle(
        &mut self,
        participant_id: &str,
        roles: RolePreference,
    ) -> Result<ToggleReport> {
        if self.queue.contains(participant_id) {
            return self.leave(participant_id).await.map(ToggleReport::Left);
        }

        self.join(participant_id, roles)
            .await
            .map(ToggleReport::Joined)
    }

    /// Attempt composition when the queue is large enough
    async fn try_create_match(&mut self) -> Result<MatchAttempt> {
        if self.queue.len() < MATCH_SIZE {
            return Ok(MatchAttempt::NotReady {
                queued: self.queue.len(),
                needed: MATCH_SIZE,
            });
        }

        let candidates = self.candidates().await?;
        let started = Instant::now();
        let result = self.composer.compose(&candidates, self.mode);
        if let Some(metrics) = &self.metrics {
            metrics.record_composition(self.mode, started.elapsed());
        }

        match result {
            CompositionResult::Teams(split) => {
                let record = MatchRecord::from_split(split, self.mode, &self.calculator)?;
                let removed = self.queue.remove_many(&record.participants());
                debug!("Removed {} participants from the queue", removed);

                info!(
                    "Match created - id: {}, mode: {}, blue: {:.0}, red: {:.0}, blue win chance: {:.1}%",
                    record.id,
                    record.mode,
                    record.blue.aggregate_rating,
                    record.red.aggregate_rating,
                    record.expected_blue_win * 100.0
                );

                self.active.push(record.clone());
                if let Some(metrics) = &self.metrics {
                    metrics.record_match_created(self.mode, self.active.len());
                    metrics.set_queue_length(self.queue.len());
                }

                Ok(MatchAttempt::Created(Box::new(record)))
            }
            CompositionResult::Infeasible(reason) => {
                info!(
                    "No match formed with {} queued: {}",
                    self.queue.len(),
                    reason
                );
                if let Some(metrics) = &self.metrics {
                    let label = match reason {
                        InfeasibleReason::NotEnoughParticipants { .. } => "not_enough_participants",
                        InfeasibleReason::NoRoleValidSplit => "no_role_valid_split",
                    };
                    metrics.record_infeasible(label);
                }
                Ok(MatchAttempt::Infeasible(reason))
            }
        }
    }

    /// Oldest queue entries the composer may look at, with current ratings
    async fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        let pool_size = self.composer.pool_size(self.queue.len());
        for entry in self.queue.entries().take(pool_size) {
            let rating = self
                .store
                .get_rating(&entry.participant_id)
                .await
                .inspect_err(|_| self.record_storage_error("get_rating"))?;
            candidates.push(Candidate {
                id: entry.participant_id.clone(),
                roles: entry.roles.clone(),
                rating,
            });
        }
        Ok(candidates)
    }

    /// Apply a reported result for the reporter's match.
    ///
    /// Returns `None` when the reporter is not in an active match. On a storage
    /// failure the match stays active so the report can be retried.
    pub async fn report(
        &mut self,
        reporter: &str,
        winner: Side,
    ) -> Result<Option<ResultReport>> {
        let Some(index) = self.active.iter().position(|m| m.contains(reporter)) else {
            debug!("Report ignored, {} is not in an active match", reporter);
            return Ok(None);
        };

        let before = self.ranks().await?;
        let started = Instant::now();
        let outcome = self.active[index]
            .apply_result(winner == Side::Blue, self.store.as_ref())
            .await
            .inspect_err(|e| {
                warn!("Failed to apply result reported by {}: {}", reporter, e);
                self.record_storage_error("apply_deltas");
            })?;

        let record = self.active.remove(index);
        if let Some(metrics) = &self.metrics {
            metrics.record_result(winner, self.active.len(), started.elapsed());
        }

        let changes = self.rank_changes_since(&before).await;

        Ok(Some(ResultReport {
            record,
            outcome,
            rank_changes: changes,
        }))
    }

    /// Record a game played outside the queue.
    ///
    /// The expectation compares the rosters' average ratings rather than their
    /// sums, so a manual game carries milder stakes than a queued one with the
    /// same players.
    pub async fn manual_result(
        &mut self,
        blue: &[ParticipantId],
        red: &[ParticipantId],
        blue_won: bool,
    ) -> Result<ResultReport> {
        let blue_team = self.team_from_ids(blue).await?;
        let red_team = self.team_from_ids(red).await?;
        let record = MatchRecord::from_averages(blue_team, red_team, self.mode, &self.calculator)?;

        for id in record.participants() {
            if let Some(active) = self.match_of(&id) {
                return Err(MatchmakingError::InvalidTeam {
                    reason: format!("{} is still in match {}", id, active.id),
                }
                .into());
            }
        }

        for id in record.participants() {
            self.store
                .ensure_participant(&id)
                .await
                .inspect_err(|_| self.record_storage_error("ensure_participant"))?;
        }

        let before = self.ranks().await?;
        let started = Instant::now();
        let outcome = record
            .apply_result(blue_won, self.store.as_ref())
            .await
            .inspect_err(|_| self.record_storage_error("apply_deltas"))?;
        if let Some(metrics) = &self.metrics {
            metrics.record_result(outcome.winner, self.active.len(), started.elapsed());
        }
        info!("Manual result recorded for match {}", record.id);

        let changes = self.rank_changes_since(&before).await;
        Ok(ResultReport {
            record,
            outcome,
            rank_changes: changes,
        })
    }

    async fn team_from_ids(&self, ids: &[ParticipantId]) -> Result<Team> {
        let mut members = Vec::with_capacity(ids.len());
        for id in ids {
            let rating = self.store.get_rating(id).await?;
            members.push(Candidate {
                id: id.clone(),
                roles: RolePreference::fill(),
                rating,
            });
        }
        Ok(Team::new(members, None))
    }

    /// Drop the reporter's match without a rating change and clear the queue
    pub fn void(&mut self, reporter: &str) -> VoidReport {
        let voided = self
            .active
            .iter()
            .position(|m| m.contains(reporter))
            .map(|index| self.active.remove(index));
        let cleared = self.queue.clear();

        match &voided {
            Some(record) => info!("Match {} voided by {}", record.id, reporter),
            None => debug!("{} reset the queue without an active match", reporter),
        }
        if let Some(metrics) = &self.metrics {
            if voided.is_some() {
                metrics.record_void(self.active.len());
            }
            metrics.set_queue_length(0);
        }

        VoidReport { voided, cleared }
    }

    /// Empty the queue
    pub fn clear(&mut self) -> usize {
        let cleared = self.queue.clear();
        info!("Queue cleared, {} entries removed", cleared);
        if let Some(metrics) = &self.metrics {
            metrics.set_queue_length(0);
        }
        cleared
    }

    /// Every stored participant, highest rating first
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let mut ratings = self.store.all_ratings().await?;
        ratings.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(ratings
            .into_iter()
            .enumerate()
            .map(|(i, (participant_id, rating))| LeaderboardEntry {
                position: i + 1,
                participant_id,
                rating,
            })
            .collect())
    }

    /// Current rating; the initial rating for unknown participants
    pub async fn rating(&self, participant_id: &str) -> Result<f64> {
        self.store.get_rating(participant_id).await
    }

    pub async fn record(&self, participant_id: &str) -> Result<Option<Record>> {
        self.store.get_record(participant_id).await
    }

    /// Tier of every stored participant
    pub async fn ranks(&self) -> Result<RankMap> {
        let ratings = self.store.all_ratings().await?;
        Ok(self.classifier.classify(&ratings))
    }

    /// Tier ladder in display order
    pub fn tiers(&self) -> &[Tier] {
        self.classifier.tiers()
    }

    async fn rank_changes_since(&self, before: &RankMap) -> Vec<RankChange> {
        match self.ranks().await {
            Ok(after) => rank_changes(before, &after),
            Err(e) => {
                warn!("Result applied but ranks could not be recomputed: {}", e);
                Vec::new()
            }
        }
    }

    fn record_rejected(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected_join(reason);
        }
    }

    fn record_storage_error(&self, operation: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_storage_error(operation);
        }
    }
}
