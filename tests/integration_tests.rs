//! Integration tests for the in-house matchmaking core
//!
//! These tests drive the session end to end:
//! - queue to match to reported result
//! - role-aware composition and infeasibility
//! - rating conservation and rank changes
//! - storage failures and SQLite persistence

mod fixtures;

use fixtures::{
    candidate, failing_rating_store, failing_result_store, fill_candidates, legacy_session,
    memory_store, queue_all, TEN,
};
use inhouse::config::QueueConfig;
use inhouse::error::MatchmakingError;
use inhouse::matchmaking::{
    CompositionResult, InfeasibleReason, MatchAttempt, Session, TeamComposer,
};
use inhouse::rating::{EloCalculator, RatingStore, SqliteRatingStore};
use inhouse::types::{MatchmakingMode, Role, RolePreference, Side};
use std::sync::Arc;

#[tokio::test]
async fn test_all_equal_ratings_balanced_match() {
    let store = memory_store();
    let mut session = legacy_session(store.clone());

    let record = queue_all(&mut session, &TEN).await.expect("match created");
    assert_eq!(record.blue.aggregate_rating, record.red.aggregate_rating);
    assert!((record.expected_blue_win - 0.5).abs() < 1e-12);
    assert!(session.queue().is_empty());

    let reporter = record.red.members[2].id.clone();
    let report = session
        .report(&reporter, Side::Blue)
        .await
        .unwrap()
        .expect("reporter is in the match");

    for member in &record.blue.members {
        assert!((store.get_rating(&member.id).await.unwrap() - 1250.0).abs() < 1e-9);
    }
    for member in &record.red.members {
        assert!((store.get_rating(&member.id).await.unwrap() - 1150.0).abs() < 1e-9);
    }
    assert_eq!(report.outcome.updates.len(), 10);
}

#[test]
fn test_unknown_participant_defaults() {
    let store = memory_store();
    let session = legacy_session(store.clone());

    tokio_test::block_on(async {
        assert_eq!(session.rating("Zed").await.unwrap(), 1200.0);
        assert!(session.record("Zed").await.unwrap().is_none());
        // Looking someone up never registers them
        assert!(store.all_ratings().await.unwrap().is_empty());
    });
}

#[tokio::test]
async fn test_mid_only_queue_stays_at_ten() {
    let store = memory_store();
    let mut session = Session::new(
        store,
        EloCalculator::default(),
        TeamComposer::new(&QueueConfig::default()),
        MatchmakingMode::Balanced,
    );

    let mut last = None;
    for id in TEN {
        last = Some(
            session
                .join(id, RolePreference::new([Role::Mid]))
                .await
                .unwrap(),
        );
    }

    let report = last.unwrap();
    assert_eq!(
        report.attempt,
        MatchAttempt::Infeasible(InfeasibleReason::NoRoleValidSplit)
    );
    assert_eq!(session.queue().len(), 10);
    assert!(session.active_matches().is_empty());
}

#[tokio::test]
async fn test_role_aware_queue_waits_for_coverage() {
    let store = memory_store();
    let mut session = Session::new(
        store,
        EloCalculator::default(),
        TeamComposer::new(&QueueConfig::default()),
        MatchmakingMode::Balanced,
    );

    // Three mid-only players block the first ten
    for id in ["m1", "m2", "m3"] {
        session
            .join(id, RolePreference::new([Role::Mid]))
            .await
            .unwrap();
    }
    for i in 0..7 {
        let report = session
            .join(&format!("f{}", i), RolePreference::fill())
            .await
            .unwrap();
        if i == 6 {
            assert!(matches!(report.attempt, MatchAttempt::Infeasible(_)));
        }
    }

    let report = session.join("f7", RolePreference::fill()).await.unwrap();
    let record = match report.attempt {
        MatchAttempt::Created(record) => record,
        other => panic!("expected a match, got {:?}", other),
    };

    assert!(!record.contains("m3"));
    assert_eq!(session.queue().participant_ids(), vec!["m3"]);
    for team in [&record.blue, &record.red] {
        let positions = team.positions.as_ref().expect("roles assigned");
        for (member, role) in team.members.iter().zip(positions) {
            assert!(member.roles.allows(*role));
        }
    }
}

#[tokio::test]
async fn test_queue_does_not_stall_behind_mid_only_players() {
    let store = memory_store();
    let mut session = Session::new(
        store,
        EloCalculator::default(),
        TeamComposer::new(&QueueConfig::default()),
        MatchmakingMode::Balanced,
    );

    for i in 0..5 {
        session
            .join(&format!("mid{}", i), RolePreference::new([Role::Mid]))
            .await
            .unwrap();
    }
    for i in 0..27 {
        session
            .join(&format!("fill{}", i), RolePreference::fill())
            .await
            .unwrap();
        if !session.active_matches().is_empty() {
            break;
        }
    }

    assert_eq!(session.active_matches().len(), 1);
    let record = &session.active_matches()[0];
    assert!(record.contains("mid0") && record.contains("mid1"));
    assert!(record.contains("fill7"));
    assert_eq!(
        session.queue().participant_ids(),
        vec!["mid2", "mid3", "mid4"]
    );
}

#[tokio::test]
async fn test_failed_composition_rolls_back_join() {
    let store = Arc::new(failing_rating_store());
    let mut session = legacy_session(store);

    for id in &TEN[..9] {
        session.join(id, RolePreference::fill()).await.unwrap();
    }
    let err = session.join(TEN[9], RolePreference::fill()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MatchmakingError>(),
        Some(MatchmakingError::StorageError { .. })
    ));
    assert_eq!(session.queue().len(), 9);
    assert!(!session.queue().participant_ids().contains(&TEN[9]));
    assert!(session.active_matches().is_empty());
}

#[tokio::test]
async fn test_rating_is_conserved() {
    let store = Arc::new(inhouse::rating::InMemoryRatingStore::with_ratings(
        1200.0,
        TEN.iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), 900.0 + 70.0 * i as f64)),
    ));
    let mut session = legacy_session(store.clone());

    let before: f64 = store.all_ratings().await.unwrap().iter().map(|r| r.1).sum();
    let record = queue_all(&mut session, &TEN).await.expect("match created");
    session
        .report(&record.blue.members[0].id, Side::Red)
        .await
        .unwrap()
        .unwrap();
    let after: f64 = store.all_ratings().await.unwrap().iter().map(|r| r.1).sum();

    assert!((before - after).abs() < 1e-6);
}

#[tokio::test]
async fn test_report_outside_match_changes_nothing() {
    let store = memory_store();
    let mut session = legacy_session(store.clone());
    queue_all(&mut session, &TEN).await.expect("match created");

    assert!(session.report("Zed", Side::Blue).await.unwrap().is_none());
    for id in TEN {
        assert_eq!(store.get_rating(id).await.unwrap(), 1200.0);
        let record = store.get_record(id).await.unwrap().unwrap();
        assert_eq!((record.wins, record.losses), (0, 0));
    }
}

#[tokio::test]
async fn test_storage_failure_keeps_match_active() {
    let store = Arc::new(failing_result_store());
    let mut session = legacy_session(store);
    let record = queue_all(&mut session, &TEN).await.expect("match created");

    let err = session
        .report(&record.blue.members[0].id, Side::Blue)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MatchmakingError>(),
        Some(MatchmakingError::StorageError { .. })
    ));
    assert_eq!(session.active_matches().len(), 1);

    // Participants are still locked into the match
    let err = session
        .join(&record.red.members[0].id, RolePreference::fill())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MatchmakingError>(),
        Some(MatchmakingError::AlreadyInMatch { .. })
    ));
}

#[tokio::test]
async fn test_result_reports_rank_changes() {
    let store = memory_store();
    let mut session = legacy_session(store.clone());
    let record = queue_all(&mut session, &TEN).await.expect("match created");

    let report = session
        .report(&record.blue.members[0].id, Side::Blue)
        .await
        .unwrap()
        .unwrap();

    let ranks = session.ranks().await.unwrap();
    assert_eq!(ranks.values().filter(|t| *t == "Challenger").count(), 1);
    assert_eq!(ranks.values().filter(|t| *t == "Challenged").count(), 1);

    // Every change lands in the current classification
    for change in &report.rank_changes {
        assert_eq!(ranks[&change.participant_id], change.current);
        assert_ne!(change.previous.as_deref(), Some(change.current.as_str()));
    }
}

#[tokio::test]
async fn test_random_mode_consumes_ten() {
    let store = memory_store();
    let mut session = legacy_session(store);
    session.set_mode(MatchmakingMode::Random);

    let record = queue_all(&mut session, &TEN).await.expect("match created");
    assert_eq!(record.mode, MatchmakingMode::Random);
    assert_eq!(record.participants().len(), 10);
    assert!(session.queue().is_empty());
}

#[tokio::test]
async fn test_sqlite_session_persists_results() {
    let store = Arc::new(SqliteRatingStore::in_memory(1200.0).await.unwrap());
    let mut session = legacy_session(store.clone());

    let record = queue_all(&mut session, &TEN).await.expect("match created");
    session
        .report(&record.red.members[0].id, Side::Red)
        .await
        .unwrap()
        .unwrap();

    let board = session.leaderboard().await.unwrap();
    assert_eq!(board.len(), 10);
    assert!((board[0].rating - 1250.0).abs() < 1e-9);
    assert!(record.red.contains(&board[0].participant_id));

    let loser = &record.blue.members[0].id;
    let stats = session.record(loser).await.unwrap().unwrap();
    assert_eq!((stats.wins, stats.losses), (0, 1));
}

#[test]
fn test_composer_matches_exhaustive_optimum() {
    let composer = TeamComposer::legacy();
    let candidates = fill_candidates(&[
        1800.0, 1750.0, 1500.0, 1450.0, 1300.0, 1200.0, 1100.0, 1000.0, 950.0, 700.0,
    ]);

    let split = match composer.compose(&candidates, MatchmakingMode::Balanced) {
        CompositionResult::Teams(split) => split,
        other => panic!("expected teams, got {:?}", other),
    };
    // Total is 12750, so the best split is 6375 against 6375
    assert!(split.rating_difference() < 1e-9);
}

#[test]
fn test_composer_with_complementary_roles() {
    let composer = TeamComposer::new(&QueueConfig::default());
    let mut candidates = Vec::new();
    for (i, role) in Role::ALL.iter().enumerate() {
        candidates.push(candidate(&format!("a{}", i), 1000.0 + 100.0 * i as f64, &[*role]));
        candidates.push(candidate(&format!("b{}", i), 1050.0 + 100.0 * i as f64, &[*role]));
    }

    let split = match composer.compose(&candidates, MatchmakingMode::Balanced) {
        CompositionResult::Teams(split) => split,
        other => panic!("expected teams, got {:?}", other),
    };
    // Each position has exactly two players, one per side
    for role in Role::ALL {
        let blue = split.blue.members.iter().filter(|m| m.roles.allows(role)).count();
        assert_eq!(blue, 1);
    }
}
