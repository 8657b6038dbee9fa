//! Inhouse - matchmaking core for 5v5 in-house games
//!
//! This crate keeps a role-aware queue, splits it into balanced teams,
//! applies Elo rating changes from reported results to a SQLite store, and
//! classifies participants into rank tiers.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod ranks;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::{MatchRecord, Session, TeamComposer};
pub use ranks::RankClassifier;
pub use rating::{EloCalculator, RatingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
