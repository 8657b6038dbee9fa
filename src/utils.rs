//! Small helpers shared by the matchmaking core

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fresh identifier for a match record
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Absolute gap between two team totals
pub fn rating_difference(rating1: f64, rating2: f64) -> f64 {
    (rating1 - rating2).abs()
}

/// First eight hex digits of a match id, enough to tell games apart in chat
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
