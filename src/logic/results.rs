//! End-of-tournament standings: set wins, points, ranking and top performers.

use crate::models::{CourtSet, PlayerId, PlayerStanding};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How many ranked players are kept as top performers.
pub const TOP_PERFORMERS: usize = 3;

/// Ranked standings of a tournament.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResults {
    /// Player ids, best first.
    pub ranking: Vec<PlayerId>,
    /// One entry per registered player, in ranking order.
    pub standings: Vec<PlayerStanding>,
    /// Everyone tied with the best (wins, points); each is credited a tournament win.
    pub champions: Vec<PlayerId>,
    pub top_performers: Vec<PlayerId>,
}

impl FinalResults {
    pub fn standing(&self, player_id: &str) -> Option<&PlayerStanding> {
        self.standings.iter().find(|s| s.player_id == player_id)
    }

    pub fn is_champion(&self, player_id: &str) -> bool {
        self.champions.iter().any(|p| p == player_id)
    }

    /// Plain-text table for logs.
    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("{:<4} {:<24} {:>5} {:>6} {:>5}\n", "#", "Player", "Wins", "Points", "Sets"));
        report.push_str(&"-".repeat(48));
        report.push('\n');
        for (idx, s) in self.standings.iter().enumerate() {
            let marker = if self.is_champion(&s.player_id) { "*" } else { "" };
            report.push_str(&format!(
                "{:<4} {:<24} {:>5} {:>6} {:>5}\n",
                format!("{}{}", idx + 1, marker),
                s.player_id,
                s.wins,
                s.points,
                s.sets_played
            ));
        }
        report
    }
}

/// Standings from completed sets only.
pub fn finalize(registered: &[PlayerId], sets: &[CourtSet]) -> FinalResults {
    finalize_with_byes(registered, sets, &[])
}

/// Standings where every entry in `byes` is worth one set win and no points.
///
/// Ranking is by wins, then points. Players with identical (wins, points) keep registration
/// order, so the result is reproducible.
pub fn finalize_with_byes(registered: &[PlayerId], sets: &[CourtSet], byes: &[PlayerId]) -> FinalResults {
    let mut standings: Vec<PlayerStanding> = Vec::with_capacity(registered.len());
    let mut index: HashMap<&str, usize> = HashMap::new();
    for pid in registered {
        if !index.contains_key(pid.as_str()) {
            index.insert(pid.as_str(), standings.len());
            standings.push(PlayerStanding::new(pid.clone()));
        }
    }

    for set in sets.iter().filter(|s| s.is_completed) {
        let winner = set.winner();
        for pid in set.player_ids() {
            let (Some(&i), Some(side)) = (index.get(pid.as_str()), set.side_of(pid)) else {
                continue;
            };
            let s = &mut standings[i];
            s.sets_played += 1;
            s.points += set.team(side).games_won;
            if winner == Some(side) {
                s.wins += 1;
            }
        }
    }

    for pid in byes {
        if let Some(&i) = index.get(pid.as_str()) {
            standings[i].byes += 1;
            standings[i].wins += 1;
        }
    }

    // Stable sort keeps registration order among full ties.
    standings.sort_by(|a, b| b.score().cmp(&a.score()));

    let champions = match standings.first() {
        Some(top) => {
            let best = top.score();
            standings
                .iter()
                .take_while(|s| s.score() == best)
                .map(|s| s.player_id.clone())
                .collect()
        }
        None => Vec::new(),
    };
    let ranking: Vec<PlayerId> = standings.iter().map(|s| s.player_id.clone()).collect();
    let top_performers = ranking.iter().take(TOP_PERFORMERS).cloned().collect();

    FinalResults {
        ranking,
        standings,
        champions,
        top_performers,
    }
}
