//! Rank tiers and their display order

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a tier decides who belongs to it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TierKind {
    /// Held by the single lowest rated participant
    BottomPinned,
    /// Ratings in `[low, high)`; a missing bound is unbounded
    Interval { low: Option<f64>, high: Option<f64> },
    /// Held by the single highest rated participant
    TopPinned,
}

impl TierKind {
    fn rank(&self) -> u8 {
        match self {
            TierKind::BottomPinned => 0,
            TierKind::Interval { .. } => 1,
            TierKind::TopPinned => 2,
        }
    }

    fn lower_bound(&self) -> f64 {
        match self {
            TierKind::Interval { low, .. } => low.unwrap_or(f64::NEG_INFINITY),
            _ => f64::NEG_INFINITY,
        }
    }
}

/// Total display order: bottom pin, intervals by lower bound, top pin
pub fn display_cmp(a: &TierKind, b: &TierKind) -> Ordering {
    a.rank()
        .cmp(&b.rank())
        .then_with(|| a.lower_bound().total_cmp(&b.lower_bound()))
}

/// A named rank bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub kind: TierKind,
    /// RGB color the chat layer uses for the rank role
    pub color: u32,
}

impl Tier {
    pub fn new(name: impl Into<String>, kind: TierKind, color: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
        }
    }

    pub fn interval(name: impl Into<String>, low: Option<f64>, high: Option<f64>, color: u32) -> Self {
        Self::new(name, TierKind::Interval { low, high }, color)
    }

    /// Whether an interval tier covers `rating`; pinned tiers never match by value
    pub fn covers(&self, rating: f64) -> bool {
        match self.kind {
            TierKind::Interval { low, high } => {
                low.map_or(true, |low| rating >= low) && high.map_or(true, |high| rating < high)
            }
            _ => false,
        }
    }

    /// Human readable boundaries, e.g. `[850, 1150)`
    pub fn bounds(&self) -> String {
        match self.kind {
            TierKind::BottomPinned => "lowest rated".to_string(),
            TierKind::TopPinned => "highest rated".to_string(),
            TierKind::Interval { low, high } => {
                let low = low.map_or_else(|| "-inf".to_string(), |v| format!("{}", v));
                let high = high.map_or_else(|| "+inf".to_string(), |v| format!("{}", v));
                format!("[{}, {})", low, high)
            }
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.bounds())
    }
}
