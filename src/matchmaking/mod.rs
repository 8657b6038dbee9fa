//! Queue, team composition and match lifecycle
//!
//! This module turns queued participants into two teams of five, tracks the
//! matches waiting for a result, and applies reported results to the rating
//! store.

pub mod composer;
pub mod game;
pub mod queue;
pub mod roles;
pub mod session;

// Re-export commonly used types
pub use composer::{CompositionResult, InfeasibleReason, TeamComposer, TeamSplit};
pub use game::{MatchOutcome, MatchRecord};
pub use queue::{MatchQueue, QueueEntry};
pub use roles::{find_assignment, fits_teams, is_assignable};
pub use session::{
    JoinReport, LeaveReport, MatchAttempt, QueueSnapshot, ResultReport, Session, ToggleReport,
    VoidReport,
};
