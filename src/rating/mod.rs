//! Rating system: Elo model and rating persistence
//!
//! This module provides the stateless Elo functions used to price a match and
//! the storage interface that keeps one rating row per participant.

pub mod elo;
pub mod sqlite;
pub mod storage;

// Re-export commonly used types
pub use elo::{EloCalculator, MatchStakes};
pub use sqlite::SqliteRatingStore;
pub use storage::{InMemoryRatingStore, RatingRow, RatingStore, RatingUpdate};
