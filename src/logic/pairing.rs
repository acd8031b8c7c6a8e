//! Round generation: balanced 2v2 teams by rating, spread over the configured courts.

use crate::models::{CourtSet, Player, PlayerId, Round, Team, TournamentError, MIN_PLAYERS};
use std::collections::HashSet;

/// Passes of the repeat-partner fixup before the pairing is accepted as-is.
pub const MAX_REPEAT_PASSES: usize = 3;

/// Output of one pairing run: the sets to play and who sits out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundPlan {
    pub round_number: u32,
    pub sets: Vec<CourtSet>,
    /// Players not placed on any court, in the order they were left out.
    pub byes: Vec<PlayerId>,
}

impl RoundPlan {
    pub fn into_round(self) -> Round {
        Round {
            round_number: self.round_number,
            sets: self.sets,
            byes: self.byes,
        }
    }
}

/// Order-independent key of two partners.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Every partnership that already shared a team.
fn played_partners(history: &[CourtSet]) -> HashSet<(String, String)> {
    history
        .iter()
        .flat_map(|s| s.teams.iter())
        .map(|t| pair_key(&t.player_ids[0], &t.player_ids[1]))
        .collect()
}

/// Swap second members with the adjacent pair wherever a partnership repeats.
/// Best effort: gives up after `MAX_REPEAT_PASSES`. Returns the number of swaps made.
fn avoid_repeats(pairs: &mut [[&Player; 2]], played: &HashSet<(String, String)>) -> usize {
    if pairs.len() < 2 || played.is_empty() {
        return 0;
    }
    let mut swaps = 0;
    for _ in 0..MAX_REPEAT_PASSES {
        let mut found = false;
        for i in 0..pairs.len() {
            if !played.contains(&pair_key(&pairs[i][0].id, &pairs[i][1].id)) {
                continue;
            }
            found = true;
            let j = if i + 1 < pairs.len() { i + 1 } else { i - 1 };
            let second = pairs[i][1];
            pairs[i][1] = pairs[j][1];
            pairs[j][1] = second;
            swaps += 1;
        }
        if !found {
            break;
        }
    }
    swaps
}

/// Generate one round.
///
/// 1. Sort by rating (descending), ties by player id.
/// 2. Snake pairing: rank i partners rank n-1-i; with an odd roster the middle player sits out.
/// 3. With history, swap partners away from repeated partnerships (at most 3 passes).
/// 4. Two consecutive pairs share a court; a leftover pair and groups beyond the last court sit out.
pub fn generate_round(
    players: &[Player],
    courts: &[String],
    history: &[CourtSet],
    round_number: u32,
) -> Result<RoundPlan, TournamentError> {
    let mut seen = HashSet::new();
    let mut sorted: Vec<&Player> = players.iter().filter(|p| seen.insert(p.id.as_str())).collect();

    let n = sorted.len();
    if n < MIN_PLAYERS || courts.len() < n / 4 {
        return Err(TournamentError::InsufficientPlayers {
            players: n,
            courts: courts.len(),
        });
    }

    sorted.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.id.cmp(&b.id)));

    let mut byes: Vec<PlayerId> = Vec::new();
    if n % 2 == 1 {
        byes.push(sorted[n / 2].id.clone());
    }

    let mut pairs: Vec<[&Player; 2]> = (0..n / 2).map(|i| [sorted[i], sorted[n - 1 - i]]).collect();

    if !history.is_empty() {
        let played = played_partners(history);
        let swaps = avoid_repeats(&mut pairs, &played);
        let repeats = pairs
            .iter()
            .filter(|p| played.contains(&pair_key(&p[0].id, &p[1].id)))
            .count();
        if swaps > 0 || repeats > 0 {
            log::debug!(
                "Round {}: {} partner swap(s), {} repeated partnership(s) kept",
                round_number,
                swaps,
                repeats
            );
        }
    }

    let mut groups = pairs.chunks_exact(2);
    let mut sets = Vec::new();
    for (court, group) in courts.iter().zip(groups.by_ref()) {
        let team_1 = Team::new(group[0][0].id.clone(), group[0][1].id.clone());
        let team_2 = Team::new(group[1][0].id.clone(), group[1][1].id.clone());
        sets.push(CourtSet::new(round_number, court.clone(), team_1, team_2));
    }
    let excess: Vec<&[&Player; 2]> = groups.by_ref().flatten().collect();
    let leftover = groups.remainder();
    for pair in excess.into_iter().chain(leftover.iter()) {
        byes.extend(pair.iter().map(|p| p.id.clone()));
    }

    Ok(RoundPlan {
        round_number,
        sets,
        byes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, rating: i32) -> Player {
        Player::new(id, id).with_rating(rating)
    }

    #[test]
    fn pair_key_ignores_order() {
        assert_eq!(pair_key("b", "a"), pair_key("a", "b"));
    }

    #[test]
    fn avoid_repeats_without_history_does_nothing() {
        let (a, b, c, d) = (player("a", 1), player("b", 1), player("c", 1), player("d", 1));
        let mut pairs = vec![[&a, &d], [&b, &c]];
        assert_eq!(avoid_repeats(&mut pairs, &HashSet::new()), 0);
        assert_eq!(pairs[0][1].id, "d");
    }

    #[test]
    fn avoid_repeats_swaps_last_pair_with_previous() {
        let (a, b, c, d) = (player("a", 1), player("b", 1), player("c", 1), player("d", 1));
        let mut pairs = vec![[&a, &d], [&b, &c]];
        let played: HashSet<_> = [pair_key("b", "c")].into_iter().collect();
        assert_eq!(avoid_repeats(&mut pairs, &played), 1);
        assert_eq!(pairs[0][1].id, "c");
        assert_eq!(pairs[1][1].id, "d");
    }
}
