//! Test fixtures and mock implementations for integration testing
#![allow(dead_code)]

use async_trait::async_trait;
use inhouse::error::{MatchmakingError, Result};
use inhouse::matchmaking::{MatchAttempt, MatchRecord, Session, TeamComposer};
use inhouse::rating::{EloCalculator, InMemoryRatingStore, RatingStore, RatingUpdate};
use inhouse::types::{Candidate, MatchmakingMode, ParticipantId, Record, Role, RolePreference};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Store {}

    #[async_trait]
    impl RatingStore for Store {
        async fn get_rating(&self, participant_id: &str) -> Result<f64>;
        async fn ensure_participant(&self, participant_id: &str) -> Result<bool>;
        async fn apply_delta(&self, participant_id: &str, delta: f64, won: bool) -> Result<()>;
        async fn apply_deltas(&self, updates: &[RatingUpdate]) -> Result<()>;
        async fn all_ratings(&self) -> Result<Vec<(ParticipantId, f64)>>;
        async fn get_record(&self, participant_id: &str) -> Result<Option<Record>>;
    }
}

/// A store that accepts reads and registrations but fails every write of a result
pub fn failing_result_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_ensure_participant().returning(|_| Ok(true));
    store.expect_get_rating().returning(|_| Ok(1200.0));
    store.expect_all_ratings().returning(|| Ok(Vec::new()));
    store.expect_get_record().returning(|_| Ok(None));
    store.expect_apply_deltas().returning(|_| {
        Err(MatchmakingError::StorageError {
            message: "disk full".to_string(),
        }
        .into())
    });
    store
}

/// A store that registers participants but cannot read their ratings
pub fn failing_rating_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_ensure_participant().returning(|_| Ok(true));
    store.expect_get_rating().returning(|_| {
        Err(MatchmakingError::StorageError {
            message: "database is locked".to_string(),
        }
        .into())
    });
    store
}

pub fn candidate(id: &str, rating: f64, roles: &[Role]) -> Candidate {
    Candidate {
        id: id.to_string(),
        roles: RolePreference::new(roles.iter().copied()),
        rating,
    }
}

/// Ten unconstrained candidates with the given ratings
pub fn fill_candidates(ratings: &[f64]) -> Vec<Candidate> {
    ratings
        .iter()
        .enumerate()
        .map(|(i, &rating)| candidate(&format!("player{}", i), rating, &[]))
        .collect()
}

/// Non-role-aware balanced session over an in-memory store
pub fn legacy_session(store: Arc<dyn RatingStore>) -> Session {
    Session::new(
        store,
        EloCalculator::default(),
        TeamComposer::legacy(),
        MatchmakingMode::Balanced,
    )
}

pub fn memory_store() -> Arc<InMemoryRatingStore> {
    Arc::new(InMemoryRatingStore::default())
}

/// Queue `ids` with no role preference and return the match formed, if any
pub async fn queue_all(session: &mut Session, ids: &[&str]) -> Option<MatchRecord> {
    let mut created = None;
    for id in ids {
        let report = session
            .join(id, RolePreference::fill())
            .await
            .expect("join should succeed");
        if let MatchAttempt::Created(record) = report.attempt {
            created = Some(*record);
        }
    }
    created
}

pub const TEN: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
