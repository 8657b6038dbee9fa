//! Rank tiers derived from ratings
//!
//! Tiers are recomputed from the whole community's ratings whenever a result
//! is applied, and the differences are handed to the chat layer.

pub mod classifier;
pub mod tier;

pub use classifier::{rank_changes, RankChange, RankClassifier, RankMap};
pub use tier::{display_cmp, Tier, TierKind};
