//! Common types used throughout the matchmaking core

use crate::error::MatchmakingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Stable unique handle of a participant (chat identity)
pub type ParticipantId = String;

/// Unique identifier for active matches
pub type MatchId = Uuid;

/// Number of players on each side of a match
pub const TEAM_SIZE: usize = 5;

/// Number of queue entries consumed by one match
pub const MATCH_SIZE: usize = TEAM_SIZE * 2;

/// Fixed positional roles of a 5v5 team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Bottom,
    Support,
}

impl Role {
    /// All positions in lineup order
    pub const ALL: [Role; TEAM_SIZE] = [
        Role::Top,
        Role::Jungle,
        Role::Mid,
        Role::Bottom,
        Role::Support,
    ];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Top => write!(f, "top"),
            Role::Jungle => write!(f, "jungle"),
            Role::Mid => write!(f, "mid"),
            Role::Bottom => write!(f, "bottom"),
            Role::Support => write!(f, "support"),
        }
    }
}

impl FromStr for Role {
    type Err = MatchmakingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_lowercase().as_str() {
            "top" => Ok(Role::Top),
            "jungle" | "jg" => Ok(Role::Jungle),
            "mid" | "middle" => Ok(Role::Mid),
            "bottom" | "bot" | "adc" => Ok(Role::Bottom),
            "support" | "sup" => Ok(Role::Support),
            _ => Err(MatchmakingError::InvalidRole {
                token: token.to_string(),
            }),
        }
    }
}

/// Set of roles a participant is willing to play; empty means "fill"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePreference(BTreeSet<Role>);

impl RolePreference {
    /// Accepts any position
    pub fn fill() -> Self {
        Self::default()
    }

    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Parse chat tokens into a preference; a `fill` token widens it to every role
    pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, MatchmakingError> {
        let mut roles = BTreeSet::new();
        let mut fill = false;
        for token in tokens {
            let token = token.as_ref();
            if token.eq_ignore_ascii_case("fill") || token.eq_ignore_ascii_case("any") {
                fill = true;
                continue;
            }
            roles.insert(token.parse::<Role>()?);
        }

        if fill {
            Ok(Self::fill())
        } else {
            Ok(Self(roles))
        }
    }

    pub fn is_fill(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this participant may be placed at `role`
    pub fn allows(&self, role: Role) -> bool {
        self.0.is_empty() || self.0.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl std::fmt::Display for RolePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_fill() {
            return write!(f, "fill");
        }
        let names: Vec<String> = self.0.iter().map(Role::to_string).collect();
        write!(f, "{}", names.join("/"))
    }
}

/// Objective used when splitting a full queue into two teams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchmakingMode {
    #[default]
    Balanced,
    Random,
}

impl MatchmakingMode {
    pub const ALL: [MatchmakingMode; 2] = [MatchmakingMode::Balanced, MatchmakingMode::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchmakingMode::Balanced => "balanced",
            MatchmakingMode::Random => "random",
        }
    }
}

impl std::fmt::Display for MatchmakingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchmakingMode {
    type Err = MatchmakingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_lowercase().as_str() {
            "balanced" => Ok(MatchmakingMode::Balanced),
            "random" => Ok(MatchmakingMode::Random),
            _ => Err(MatchmakingError::InvalidMode {
                token: token.to_string(),
            }),
        }
    }
}

/// Side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Blue => write!(f, "blue"),
            Side::Red => write!(f, "red"),
        }
    }
}

impl FromStr for Side {
    type Err = MatchmakingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_lowercase().as_str() {
            "blue" => Ok(Side::Blue),
            "red" => Ok(Side::Red),
            _ => Err(MatchmakingError::InvalidSide {
                token: token.to_string(),
            }),
        }
    }
}

/// Win/loss counters of a participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u64,
    pub losses: u64,
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}W - {}L", self.wins, self.losses)
    }
}

/// A participant with the rating they carry into matchmaking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ParticipantId,
    pub roles: RolePreference,
    pub rating: f64,
}

/// One side of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub members: Vec<Candidate>,
    /// Position of each member, aligned with `members`, when roles were assigned
    pub positions: Option<Vec<Role>>,
    /// Sum of member ratings at composition time
    pub aggregate_rating: f64,
}

impl Team {
    pub fn new(members: Vec<Candidate>, positions: Option<Vec<Role>>) -> Self {
        let aggregate_rating = members.iter().map(|m| m.rating).sum();
        Self {
            members,
            positions,
            aggregate_rating,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.iter().map(|m| &m.id)
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.members.iter().any(|m| m.id == participant_id)
    }

    pub fn average_rating(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.aggregate_rating / self.members.len() as f64
    }

    /// Members paired with their assigned position, if any
    pub fn lineup(&self) -> Vec<(&Candidate, Option<Role>)> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                let role = self
                    .positions
                    .as_ref()
                    .and_then(|positions| positions.get(i).copied());
                (member, role)
            })
            .collect()
    }
}

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub participant_id: ParticipantId,
    pub rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_accepts_aliases() {
        assert_eq!("TOP".parse::<Role>().unwrap(), Role::Top);
        assert_eq!("jg".parse::<Role>().unwrap(), Role::Jungle);
        assert_eq!("adc".parse::<Role>().unwrap(), Role::Bottom);
        assert_eq!("sup".parse::<Role>().unwrap(), Role::Support);
    }

    #[test]
    fn test_invalid_role_rejected() {
        let err = "carry".parse::<Role>().unwrap_err();
        assert!(matches!(err, MatchmakingError::InvalidRole { token } if token == "carry"));
    }

    #[test]
    fn test_role_preference_fill_widens() {
        let pref = RolePreference::parse_tokens(&["mid", "fill"]).unwrap();
        assert!(pref.is_fill());
        for role in Role::ALL {
            assert!(pref.allows(role));
        }
    }

    #[test]
    fn test_role_preference_restricts() {
        let pref = RolePreference::parse_tokens(&["mid", "top"]).unwrap();
        assert!(pref.allows(Role::Mid));
        assert!(pref.allows(Role::Top));
        assert!(!pref.allows(Role::Support));
        assert_eq!(pref.to_string(), "top/mid");
    }

    #[test]
    fn test_team_aggregate_and_lineup() {
        let members = vec![
            Candidate {
                id: "a".to_string(),
                roles: RolePreference::fill(),
                rating: 1000.0,
            },
            Candidate {
                id: "b".to_string(),
                roles: RolePreference::new([Role::Mid]),
                rating: 1400.0,
            },
        ];
        let team = Team::new(members, Some(vec![Role::Top, Role::Mid]));

        assert_eq!(team.aggregate_rating, 2400.0);
        assert_eq!(team.average_rating(), 1200.0);
        assert!(team.contains("b"));
        assert_eq!(team.lineup()[1].1, Some(Role::Mid));
    }

    #[test]
    fn test_mode_and_side_parsing() {
        assert_eq!(
            "Random".parse::<MatchmakingMode>().unwrap(),
            MatchmakingMode::Random
        );
        assert!("ranked".parse::<MatchmakingMode>().is_err());
        assert_eq!("red".parse::<Side>().unwrap(), Side::Red);
        assert!("green".parse::<Side>().is_err());
    }
}
