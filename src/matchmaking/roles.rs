//! Role assignment for a team of five
//!
//! A team is role-assignable when its members can be mapped one-to-one onto
//! the five positions while respecting every member's preference. Five members
//! only have 120 orderings, so the search is plain brute force.

use crate::types::{Role, RolePreference, TEAM_SIZE};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// Every ordering of the five positions
fn all_orderings() -> Vec<Vec<Role>> {
    Role::ALL.iter().copied().permutations(TEAM_SIZE).collect()
}

fn fits(preferences: &[&RolePreference], ordering: &[Role]) -> bool {
    preferences
        .iter()
        .zip(ordering)
        .all(|(preference, role)| preference.allows(*role))
}

/// Find a position for each member, aligned with `preferences`.
///
/// Orderings are tried in shuffled order so that members with several
/// acceptable positions are not always given the same one. Returns `None`
/// when the team is not assignable or does not have exactly five members.
pub fn find_assignment<R: Rng + ?Sized>(
    preferences: &[&RolePreference],
    rng: &mut R,
) -> Option<Vec<Role>> {
    if preferences.len() != TEAM_SIZE {
        return None;
    }

    let mut orderings = all_orderings();
    orderings.shuffle(rng);
    orderings
        .into_iter()
        .find(|ordering| fits(preferences, ordering))
}

/// Deterministic assignability check
pub fn is_assignable(preferences: &[&RolePreference]) -> bool {
    preferences.len() == TEAM_SIZE
        && all_orderings()
            .iter()
            .any(|ordering| fits(preferences, ordering))
}

/// Positions a member accepts, one bit per entry of [`Role::ALL`]
fn role_mask(preference: &RolePreference) -> u8 {
    Role::ALL
        .iter()
        .enumerate()
        .filter(|(_, role)| preference.allows(**role))
        .fold(0, |mask, (i, _)| mask | (1 << i))
}

/// Whether the members can be seated across `teams` teams with every position
/// used at most once per team.
///
/// Checks Hall's condition for each set of positions: the members who accept
/// nothing outside the set must fit in `teams` copies of it. Ten members that
/// pass with `teams == 2` can always be split into two assignable teams.
pub fn fits_teams(preferences: &[&RolePreference], teams: usize) -> bool {
    let masks: Vec<u8> = preferences.iter().map(|p| role_mask(p)).collect();
    (1u8..(1 << TEAM_SIZE)).all(|set| {
        let confined = masks.iter().filter(|&&mask| mask & !set == 0).count();
        confined <= teams * set.count_ones() as usize
    })
}
