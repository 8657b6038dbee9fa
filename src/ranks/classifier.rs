//! Rating to tier classification
//!
//! Interval tiers partition the rating axis. The two pinned tiers override
//! the interval tier for the lowest and highest rated participant.

use crate::error::{MatchmakingError, Result};
use crate::ranks::tier::{display_cmp, Tier, TierKind};
use crate::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Tier name per participant
pub type RankMap = BTreeMap<ParticipantId, String>;

/// A participant whose tier changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub participant_id: ParticipantId,
    /// `None` when the participant had no tier before
    pub previous: Option<String>,
    pub current: String,
}

/// Maps ratings to named tiers
#[derive(Debug, Clone)]
pub struct RankClassifier {
    /// Kept in display order
    tiers: Vec<Tier>,
}

impl RankClassifier {
    /// Build a classifier from a tier list.
    ///
    /// Requires exactly one bottom-pinned and one top-pinned tier, and interval
    /// tiers that cover the whole rating axis without gaps or overlaps.
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self> {
        tiers.sort_by(|a, b| display_cmp(&a.kind, &b.kind));

        let bottoms = tiers
            .iter()
            .filter(|t| t.kind == TierKind::BottomPinned)
            .count();
        let tops = tiers
            .iter()
            .filter(|t| t.kind == TierKind::TopPinned)
            .count();
        if bottoms != 1 || tops != 1 {
            return Err(invalid(format!(
                "expected one bottom and one top pinned tier, found {} and {}",
                bottoms, tops
            )));
        }

        let intervals: Vec<(Option<f64>, Option<f64>, &str)> = tiers
            .iter()
            .filter_map(|t| match t.kind {
                TierKind::Interval { low, high } => Some((low, high, t.name.as_str())),
                _ => None,
            })
            .collect();

        let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
            return Err(invalid("at least one interval tier is required".to_string()));
        };
        if first.0.is_some() {
            return Err(invalid(format!("{} must be unbounded below", first.2)));
        }
        if last.1.is_some() {
            return Err(invalid(format!("{} must be unbounded above", last.2)));
        }

        for (low, high, name) in &intervals {
            if let (Some(low), Some(high)) = (low, high) {
                if low >= high {
                    return Err(invalid(format!("{} has an empty interval", name)));
                }
            }
        }
        for pair in intervals.windows(2) {
            let (_, high, name) = pair[0];
            let (low, _, next) = pair[1];
            if high.is_none() || high != low {
                return Err(invalid(format!(
                    "{} and {} do not meet at a shared boundary",
                    name, next
                )));
            }
        }

        Ok(Self { tiers })
    }

    /// The community ladder with its role colors
    pub fn default_ladder() -> Self {
        Self {
            tiers: vec![
                Tier::new("Challenged", TierKind::BottomPinned, 0xFFFFFF),
                Tier::interval("Iron", None, Some(850.0), 0x607D8B),
                Tier::interval("Bronze", Some(850.0), Some(1150.0), 0xA84300),
                Tier::interval("Silver", Some(1150.0), Some(1500.0), 0x979C9F),
                Tier::interval("Gold", Some(1500.0), Some(1850.0), 0xF1C40F),
                Tier::interval("Platinum", Some(1850.0), Some(2200.0), 0x7289DA),
                Tier::interval("Diamond", Some(2200.0), None, 0x3498DB),
                Tier::new("Challenger", TierKind::TopPinned, 0x71368A),
            ],
        }
    }

    /// Tiers in display order
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Interval tier for a rating, ignoring the pins
    pub fn interval_tier(&self, rating: f64) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.covers(rating))
    }

    fn pinned(&self, kind: TierKind) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.kind == kind)
    }

    /// Assign exactly one tier to every participant
    pub fn classify(&self, ratings: &[(ParticipantId, f64)]) -> RankMap {
        let mut ranks: RankMap = ratings
            .iter()
            .filter_map(|(id, rating)| {
                self.interval_tier(*rating)
                    .map(|tier| (id.clone(), tier.name.clone()))
            })
            .collect();

        let by_rating = |a: &&(ParticipantId, f64), b: &&(ParticipantId, f64)| -> Ordering {
            a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
        };

        // Bottom first so that a lone participant ends up with the top pin
        if let (Some((id, _)), Some(tier)) = (
            ratings.iter().min_by(by_rating),
            self.pinned(TierKind::BottomPinned),
        ) {
            ranks.insert(id.clone(), tier.name.clone());
        }
        if let (Some((id, _)), Some(tier)) = (
            ratings.iter().max_by(by_rating),
            self.pinned(TierKind::TopPinned),
        ) {
            ranks.insert(id.clone(), tier.name.clone());
        }

        debug!("Classified {} participants", ranks.len());
        ranks
    }
}

impl Default for RankClassifier {
    fn default() -> Self {
        Self::default_ladder()
    }
}

/// Participants whose tier differs between two classifications
pub fn rank_changes(before: &RankMap, after: &RankMap) -> Vec<RankChange> {
    after
        .iter()
        .filter(|(id, tier)| before.get(*id) != Some(*tier))
        .map(|(id, tier)| RankChange {
            participant_id: id.clone(),
            previous: before.get(id).cloned(),
            current: tier.clone(),
        })
        .collect()
}

fn invalid(reason: String) -> anyhow::Error {
    MatchmakingError::ConfigurationError {
        message: format!("Invalid tier ladder: {}", reason),
    }
    .into()
}
