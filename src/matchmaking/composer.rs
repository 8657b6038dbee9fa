//! Team composition: turning queued participants into two teams of five
//!
//! Every 5-of-10 split of a candidate pool is considered (252 of them). In
//! random mode one split is drawn uniformly; in balanced mode splits are
//! shuffled, stably sorted by rating difference, and the first split where
//! both teams are role-assignable wins. Shuffling before the sort makes ties
//! between equally balanced splits resolve uniformly at random.
//!
//! Role-aware pools come from the oldest entries of the queue. When none of
//! them can be seated, the oldest ten that can are used instead, so a blocked
//! head of the queue never stalls it.

use crate::config::QueueConfig;
use crate::matchmaking::roles::{find_assignment, fits_teams};
use crate::types::{Candidate, MatchmakingMode, ParticipantId, Role, Team, MATCH_SIZE, TEAM_SIZE};
use crate::utils::rating_difference;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Two teams produced from the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSplit {
    pub blue: Team,
    pub red: Team,
}

impl TeamSplit {
    pub fn rating_difference(&self) -> f64 {
        rating_difference(self.blue.aggregate_rating, self.red.aggregate_rating)
    }

    /// Everyone consumed from the queue by this split
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.blue.ids().chain(self.red.ids()).cloned().collect()
    }
}

/// Why no teams were produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfeasibleReason {
    NotEnoughParticipants { queued: usize, needed: usize },
    NoRoleValidSplit,
}

impl std::fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfeasibleReason::NotEnoughParticipants { queued, needed } => {
                write!(f, "{}/{} queued", queued, needed)
            }
            InfeasibleReason::NoRoleValidSplit => {
                write!(f, "no split satisfies everyone's roles")
            }
        }
    }
}

/// Result of a composition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionResult {
    /// Teams were produced; exactly ten participants are consumed
    Teams(TeamSplit),
    /// No teams possible with the current queue; nothing is consumed
    Infeasible(InfeasibleReason),
}

/// Role assignments already computed for a team, keyed by sorted queue positions
type AssignmentCache = HashMap<Vec<usize>, Option<Vec<Role>>>;

/// Splits queued candidates into two teams
#[derive(Debug, Clone)]
pub struct TeamComposer {
    role_aware: bool,
    max_candidate_window: usize,
}

impl TeamComposer {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            role_aware: config.role_aware,
            max_candidate_window: config.max_candidate_window.clamp(MATCH_SIZE, 14),
        }
    }

    /// Composer that ignores role preferences
    pub fn legacy() -> Self {
        Self::new(&QueueConfig::legacy())
    }

    pub fn role_aware(&self) -> bool {
        self.role_aware
    }

    /// How many of the oldest queue entries a composition may draw from
    pub fn pool_size(&self, queued: usize) -> usize {
        if self.role_aware {
            queued
        } else {
            queued.min(MATCH_SIZE)
        }
    }

    /// Compose teams from the queue, oldest entry first
    pub fn compose(&self, queue: &[Candidate], mode: MatchmakingMode) -> CompositionResult {
        self.compose_with_rng(queue, mode, &mut rand::thread_rng())
    }

    pub fn compose_with_rng<R: Rng + ?Sized>(
        &self,
        queue: &[Candidate],
        mode: MatchmakingMode,
        rng: &mut R,
    ) -> CompositionResult {
        if queue.len() < MATCH_SIZE {
            return CompositionResult::Infeasible(InfeasibleReason::NotEnoughParticipants {
                queued: queue.len(),
                needed: MATCH_SIZE,
            });
        }

        let oldest: Vec<usize> = (0..MATCH_SIZE).collect();

        match mode {
            MatchmakingMode::Random => {
                CompositionResult::Teams(self.random_split(queue, &oldest, rng))
            }
            MatchmakingMode::Balanced if !self.role_aware => {
                let mut cache = AssignmentCache::new();
                match self.balanced_split(queue, &oldest, &mut cache, rng) {
                    Some(split) => CompositionResult::Teams(split),
                    None => CompositionResult::Infeasible(InfeasibleReason::NoRoleValidSplit),
                }
            }
            MatchmakingMode::Balanced => {
                let window = queue.len().min(self.max_candidate_window);
                let mut cache = AssignmentCache::new();

                if oldest_seatable_pool(&queue[..window]).is_some() {
                    // Lexicographic order over queue positions prefers older entries
                    for pool in (0..window).combinations(MATCH_SIZE) {
                        if let Some(split) = self.balanced_split(queue, &pool, &mut cache, rng) {
                            debug!("Found role-valid split in pool {:?}", pool);
                            return CompositionResult::Teams(split);
                        }
                    }
                }

                // Nothing in the window fits; later entries may still complete a match
                if let Some(pool) = oldest_seatable_pool(queue) {
                    if let Some(split) = self.balanced_split(queue, &pool, &mut cache, rng) {
                        debug!(
                            "Found role-valid split past the oldest {} in pool {:?}",
                            window, pool
                        );
                        return CompositionResult::Teams(split);
                    }
                }

                debug!("No role-valid split among {} queued", queue.len());
                CompositionResult::Infeasible(InfeasibleReason::NoRoleValidSplit)
            }
        }
    }

    /// Uniformly random split of the pool, no role or balance constraint
    fn random_split<R: Rng + ?Sized>(
        &self,
        queue: &[Candidate],
        pool: &[usize],
        rng: &mut R,
    ) -> TeamSplit {
        let combinations: Vec<Vec<usize>> = pool.iter().copied().combinations(TEAM_SIZE).collect();
        let blue = combinations
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| pool.iter().copied().take(TEAM_SIZE).collect());
        let red = complement(pool, &blue);

        let blue_positions = self.positions_for(queue, &blue, rng);
        let red_positions = self.positions_for(queue, &red, rng);

        TeamSplit {
            blue: build_team(queue, &blue, blue_positions),
            red: build_team(queue, &red, red_positions),
        }
    }

    /// Most balanced split of the pool whose teams are both role-assignable
    fn balanced_split<R: Rng + ?Sized>(
        &self,
        queue: &[Candidate],
        pool: &[usize],
        cache: &mut AssignmentCache,
        rng: &mut R,
    ) -> Option<TeamSplit> {
        let mut combinations: Vec<Vec<usize>> =
            pool.iter().copied().combinations(TEAM_SIZE).collect();
        combinations.shuffle(rng);

        let mut scored: Vec<(f64, Vec<usize>, Vec<usize>)> = combinations
            .into_iter()
            .map(|blue| {
                let red = complement(pool, &blue);
                let difference = rating_difference(sum_ratings(queue, &blue), sum_ratings(queue, &red));
                (difference, blue, red)
            })
            .collect();
        // Stable sort keeps the shuffled order among equal differences
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, blue, red) in scored {
            if !self.role_aware {
                return Some(TeamSplit {
                    blue: build_team(queue, &blue, None),
                    red: build_team(queue, &red, None),
                });
            }

            let Some(blue_positions) = assignment_for(queue, &blue, cache, rng) else {
                continue;
            };
            let Some(red_positions) = assignment_for(queue, &red, cache, rng) else {
                continue;
            };

            return Some(TeamSplit {
                blue: build_team(queue, &blue, Some(blue_positions)),
                red: build_team(queue, &red, Some(red_positions)),
            });
        }

        None
    }

    /// Best-effort positions for display when roles are tracked
    fn positions_for<R: Rng + ?Sized>(
        &self,
        queue: &[Candidate],
        team: &[usize],
        rng: &mut R,
    ) -> Option<Vec<Role>> {
        if !self.role_aware {
            return None;
        }
        let preferences: Vec<_> = team.iter().map(|&i| &queue[i].roles).collect();
        find_assignment(&preferences, rng)
    }
}

impl Default for TeamComposer {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

fn complement(pool: &[usize], team: &[usize]) -> Vec<usize> {
    pool.iter()
        .copied()
        .filter(|i| !team.contains(i))
        .collect()
}

fn sum_ratings(queue: &[Candidate], team: &[usize]) -> f64 {
    team.iter().map(|&i| queue[i].rating).sum()
}

fn build_team(queue: &[Candidate], team: &[usize], positions: Option<Vec<Role>>) -> Team {
    Team::new(team.iter().map(|&i| queue[i].clone()).collect(), positions)
}

/// Oldest ten entries that can still fill both teams, picked greedily.
///
/// Seatable sets of members form a matroid, so skipping an entry only when it
/// breaks seating finds ten whenever any ten in `queue` can be seated.
fn oldest_seatable_pool(queue: &[Candidate]) -> Option<Vec<usize>> {
    let mut pool = Vec::with_capacity(MATCH_SIZE);
    let mut preferences = Vec::with_capacity(MATCH_SIZE);

    for (i, candidate) in queue.iter().enumerate() {
        preferences.push(&candidate.roles);
        if fits_teams(&preferences, 2) {
            pool.push(i);
            if pool.len() == MATCH_SIZE {
                return Some(pool);
            }
        } else {
            preferences.pop();
        }
    }

    None
}

fn assignment_for<R: Rng + ?Sized>(
    queue: &[Candidate],
    team: &[usize],
    cache: &mut AssignmentCache,
    rng: &mut R,
) -> Option<Vec<Role>> {
    cache
        .entry(team.to_vec())
        .or_insert_with(|| {
            let preferences: Vec<_> = team.iter().map(|&i| &queue[i].roles).collect();
            find_assignment(&preferences, rng)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaking::roles::is_assignable;
    use crate::types::RolePreference;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn candidate(id: &str, rating: f64, roles: &[&str]) -> Candidate {
        Candidate {
            id: id.to_string(),
            roles: RolePreference::parse_tokens(roles).unwrap(),
            rating,
        }
    }

    fn fill_queue(ratings: &[f64]) -> Vec<Candidate> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, &rating)| candidate(&format!("p{}", i), rating, &[]))
            .collect()
    }

    fn expect_teams(result: CompositionResult) -> TeamSplit {
        match result {
            CompositionResult::Teams(split) => split,
            CompositionResult::Infeasible(reason) => panic!("expected teams, got {}", reason),
        }
    }

    fn assert_disjoint_fives(split: &TeamSplit) {
        assert_eq!(split.blue.members.len(), TEAM_SIZE);
        assert_eq!(split.red.members.len(), TEAM_SIZE);
        let ids: HashSet<_> = split.participant_ids().into_iter().collect();
        assert_eq!(ids.len(), MATCH_SIZE);
    }

    /// Smallest difference over every 5/5 split of the first ten
    fn best_difference(queue: &[Candidate]) -> f64 {
        let pool: Vec<usize> = (0..MATCH_SIZE).collect();
        pool.iter()
            .copied()
            .combinations(TEAM_SIZE)
            .map(|blue| {
                let red = complement(&pool, &blue);
                rating_difference(sum_ratings(queue, &blue), sum_ratings(queue, &red))
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_not_enough_participants() {
        let composer = TeamComposer::legacy();
        let queue = fill_queue(&[1200.0; 9]);

        let result = composer.compose(&queue, MatchmakingMode::Balanced);
        assert_eq!(
            result,
            CompositionResult::Infeasible(InfeasibleReason::NotEnoughParticipants {
                queued: 9,
                needed: 10
            })
        );
    }

    #[test]
    fn test_equal_ratings_give_zero_difference() {
        let composer = TeamComposer::legacy();
        let queue = fill_queue(&[1200.0; 10]);

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        assert_disjoint_fives(&split);
        assert_eq!(split.rating_difference(), 0.0);
        assert_eq!(split.blue.aggregate_rating, 6000.0);
        assert!(split.blue.positions.is_none());
    }

    #[test]
    fn test_balanced_finds_exact_split() {
        let composer = TeamComposer::legacy();
        let queue = fill_queue(&[
            2000.0, 1000.0, 1500.0, 1500.0, 1200.0, 1300.0, 1100.0, 1400.0, 1600.0, 1400.0,
        ]);

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        assert_disjoint_fives(&split);
        assert_eq!(split.rating_difference(), best_difference(&queue));
    }

    #[test]
    fn test_random_mode_ignores_roles() {
        let composer = TeamComposer::default();
        let mut queue = fill_queue(&[1200.0; 10]);
        for entry in queue.iter_mut() {
            entry.roles = RolePreference::new([Role::Mid]);
        }

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Random));
        assert_disjoint_fives(&split);
        assert!(split.blue.positions.is_none());
    }

    #[test]
    fn test_random_mode_varies_teams() {
        let composer = TeamComposer::legacy();
        let queue = fill_queue(&[1200.0; 10]);
        let mut rng = StdRng::seed_from_u64(99);

        let blues: HashSet<Vec<ParticipantId>> = (0..20)
            .map(|_| {
                let split =
                    expect_teams(composer.compose_with_rng(&queue, MatchmakingMode::Random, &mut rng));
                let mut ids: Vec<_> = split.blue.ids().cloned().collect();
                ids.sort();
                ids
            })
            .collect();
        assert!(blues.len() > 1);
    }

    #[test]
    fn test_balanced_ties_are_not_fixed() {
        let composer = TeamComposer::legacy();
        let queue = fill_queue(&[1200.0; 10]);
        let mut rng = StdRng::seed_from_u64(5);

        let blues: HashSet<Vec<ParticipantId>> = (0..20)
            .map(|_| {
                let split = expect_teams(composer.compose_with_rng(
                    &queue,
                    MatchmakingMode::Balanced,
                    &mut rng,
                ));
                let mut ids: Vec<_> = split.blue.ids().cloned().collect();
                ids.sort();
                ids
            })
            .collect();
        assert!(blues.len() > 1);
    }

    #[test]
    fn test_role_aware_split_is_assignable() {
        let composer = TeamComposer::default();
        let queue = vec![
            candidate("a", 1500.0, &["mid"]),
            candidate("b", 1400.0, &["mid"]),
            candidate("c", 1300.0, &["top"]),
            candidate("d", 1200.0, &["top"]),
            candidate("e", 1100.0, &["jungle"]),
            candidate("f", 1000.0, &["jungle"]),
            candidate("g", 1250.0, &["support"]),
            candidate("h", 1250.0, &["support"]),
            candidate("i", 1350.0, &["bottom", "adc"]),
            candidate("j", 1150.0, &["bottom"]),
        ];

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        assert_disjoint_fives(&split);

        for team in [&split.blue, &split.red] {
            let preferences: Vec<_> = team.members.iter().map(|m| &m.roles).collect();
            assert!(is_assignable(&preferences));
            let positions = team.positions.as_ref().unwrap();
            for (member, role) in team.members.iter().zip(positions) {
                assert!(member.roles.allows(*role));
            }
        }
        // The two mid players must be on opposite sides
        assert_ne!(split.blue.contains("a"), split.blue.contains("b"));
    }

    #[test]
    fn test_mid_only_queue_is_infeasible() {
        let composer = TeamComposer::default();
        let mut queue = vec![candidate("solo", 1200.0, &["mid"])];
        for i in 0..9 {
            queue.push(candidate(&format!("m{}", i), 1200.0, &["mid"]));
        }

        let result = composer.compose(&queue, MatchmakingMode::Balanced);
        assert_eq!(
            result,
            CompositionResult::Infeasible(InfeasibleReason::NoRoleValidSplit)
        );
    }

    #[test]
    fn test_role_aware_skips_blocking_entry() {
        // Three mid-only players can never fit two teams; the eleventh entry unblocks
        let composer = TeamComposer::default();
        let mut queue = vec![
            candidate("m1", 1200.0, &["mid"]),
            candidate("m2", 1200.0, &["mid"]),
            candidate("m3", 1200.0, &["mid"]),
        ];
        for i in 0..8 {
            queue.push(candidate(&format!("f{}", i), 1200.0, &[]));
        }

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        let ids = split.participant_ids();
        assert_eq!(ids.len(), MATCH_SIZE);
        // Lexicographic pools drop the youngest mid-only entry first
        assert!(ids.contains(&"m1".to_string()));
        assert!(ids.contains(&"m2".to_string()));
        assert!(!ids.contains(&"m3".to_string()));
    }

    #[test]
    fn test_entries_past_window_unblock_composition() {
        // Any ten of the oldest twelve hold at least three mid-only players
        let composer = TeamComposer::default();
        let mut queue: Vec<Candidate> = (1..=5)
            .map(|i| candidate(&format!("m{}", i), 1200.0, &["mid"]))
            .collect();
        for i in 0..7 {
            queue.push(candidate(&format!("f{}", i), 1100.0 + 20.0 * i as f64, &[]));
        }
        assert_eq!(
            composer.compose(&queue, MatchmakingMode::Balanced),
            CompositionResult::Infeasible(InfeasibleReason::NoRoleValidSplit)
        );

        for i in 7..27 {
            queue.push(candidate(&format!("f{}", i), 1100.0 + 20.0 * i as f64, &[]));
        }
        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        assert_disjoint_fives(&split);

        let ids = split.participant_ids();
        for taken in ["m1", "m2", "f7"] {
            assert!(ids.contains(&taken.to_string()));
        }
        for skipped in ["m3", "m4", "m5", "f8"] {
            assert!(!ids.contains(&skipped.to_string()));
        }
        for team in [&split.blue, &split.red] {
            let preferences: Vec<_> = team.members.iter().map(|m| &m.roles).collect();
            assert!(is_assignable(&preferences));
        }
    }

    #[test]
    fn test_pool_size_follows_role_awareness() {
        assert_eq!(TeamComposer::legacy().pool_size(32), MATCH_SIZE);
        assert_eq!(TeamComposer::legacy().pool_size(4), 4);
        assert_eq!(TeamComposer::default().pool_size(32), 32);
    }

    #[test]
    fn test_legacy_mode_skips_role_test() {
        let composer = TeamComposer::legacy();
        let mut queue = fill_queue(&[1200.0; 10]);
        for entry in queue.iter_mut() {
            entry.roles = RolePreference::new([Role::Support]);
        }

        let split = expect_teams(composer.compose(&queue, MatchmakingMode::Balanced));
        assert_disjoint_fives(&split);
    }

    proptest! {
        #[test]
        fn prop_balanced_is_optimal_without_roles(
            ratings in proptest::collection::vec(0.0f64..3000.0, MATCH_SIZE)
        ) {
            let composer = TeamComposer::legacy();
            let queue = fill_queue(&ratings);

            let split = match composer.compose(&queue, MatchmakingMode::Balanced) {
                CompositionResult::Teams(split) => split,
                CompositionResult::Infeasible(_) => return Err(TestCaseError::fail("infeasible")),
            };

            let ids: HashSet<_> = split.participant_ids().into_iter().collect();
            prop_assert_eq!(ids.len(), MATCH_SIZE);
            prop_assert!(split.rating_difference() <= best_difference(&queue) + 1e-6);
        }

        #[test]
        fn prop_role_aware_feasibility_matches_exhaustive_search(
            role_choices in proptest::collection::vec(0usize..6, MATCH_SIZE)
        ) {
            // 0..5 pins one role, 5 means fill
            let queue: Vec<Candidate> = role_choices
                .iter()
                .enumerate()
                .map(|(i, &choice)| Candidate {
                    id: format!("p{}", i),
                    roles: if choice < TEAM_SIZE {
                        RolePreference::new([Role::ALL[choice]])
                    } else {
                        RolePreference::fill()
                    },
                    rating: 1000.0 + (i as f64) * 37.0,
                })
                .collect();

            let pool: Vec<usize> = (0..MATCH_SIZE).collect();
            let exists = pool.iter().copied().combinations(TEAM_SIZE).any(|blue| {
                let red = complement(&pool, &blue);
                let blue_prefs: Vec<_> = blue.iter().map(|&i| &queue[i].roles).collect();
                let red_prefs: Vec<_> = red.iter().map(|&i| &queue[i].roles).collect();
                is_assignable(&blue_prefs) && is_assignable(&red_prefs)
            });

            let composer = TeamComposer::default();
            match composer.compose(&queue, MatchmakingMode::Balanced) {
                CompositionResult::Teams(split) => {
                    prop_assert!(exists);
                    for team in [&split.blue, &split.red] {
                        let preferences: Vec<_> = team.members.iter().map(|m| &m.roles).collect();
                        prop_assert!(is_assignable(&preferences));
                    }
                }
                CompositionResult::Infeasible(reason) => {
                    prop_assert!(!exists);
                    prop_assert_eq!(reason, InfeasibleReason::NoRoleValidSplit);
                }
            }
        }
    }
}
