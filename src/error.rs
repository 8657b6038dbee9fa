//! Error types for the in-house matchmaking core
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid role: {token} (expected one of top, jungle, mid, bottom, support, fill)")]
    InvalidRole { token: String },

    #[error("Invalid matchmaking mode: {token} (expected balanced or random)")]
    InvalidMode { token: String },

    #[error("Invalid side: {token} (expected blue or red)")]
    InvalidSide { token: String },

    #[error("Participant already queued: {participant_id}")]
    AlreadyQueued { participant_id: String },

    #[error("Participant already in an active match: {participant_id}")]
    AlreadyInMatch { participant_id: String },

    #[error("Invalid team: {reason}")]
    InvalidTeam { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
