//! Ordered waiting list of participants

use crate::error::{MatchmakingError, Result};
use crate::types::{ParticipantId, RolePreference};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A participant waiting for a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub participant_id: ParticipantId,
    pub roles: RolePreference,
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(participant_id: ParticipantId, roles: RolePreference) -> Self {
        Self {
            participant_id,
            roles,
            joined_at: current_timestamp(),
        }
    }
}

/// FIFO queue; the front is the least recently queued entry
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: VecDeque<QueueEntry>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; each participant may be queued once
    pub fn push(&mut self, entry: QueueEntry) -> Result<()> {
        if self.contains(&entry.participant_id) {
            return Err(MatchmakingError::AlreadyQueued {
                participant_id: entry.participant_id,
            }
            .into());
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Remove a participant, returning their entry if they were queued
    pub fn remove(&mut self, participant_id: &str) -> Option<QueueEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.participant_id == participant_id)?;
        self.entries.remove(index)
    }

    /// Remove every listed participant, keeping the order of the rest
    pub fn remove_many(&mut self, participant_ids: &[ParticipantId]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !participant_ids.contains(&e.participant_id));
        before - self.entries.len()
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.participant_id == participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .map(|e| e.participant_id.clone())
            .collect()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}
