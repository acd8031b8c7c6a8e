//! Elo rating update after a completed set, with fractional outcomes for teams of two.

use crate::models::Player;

/// K-factor while a player has finished fewer than `ESTABLISHED_AFTER` tournaments.
pub const K_FACTOR_NEW: f64 = 32.0;

/// K-factor for established players.
pub const K_FACTOR_ESTABLISHED: f64 = 16.0;

pub const ESTABLISHED_AFTER: u32 = 10;

/// Expected score of a side rated `rating` against a side rated `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(f64::from(opponent - rating) / 400.0))
}

pub fn k_factor(player: &Player) -> f64 {
    if player.games_played() < ESTABLISHED_AFTER {
        K_FACTOR_NEW
    } else {
        K_FACTOR_ESTABLISHED
    }
}

/// Integer average of the members' ratings (truncating).
pub fn team_rating(team: &[Player]) -> i32 {
    if team.is_empty() {
        return 0;
    }
    let sum: i64 = team.iter().map(|p| i64::from(p.rating)).sum();
    (sum / team.len() as i64) as i32
}

/// Rating change for one player: truncated toward zero.
fn rating_delta(player: &Player, result: f64, expected: f64) -> i32 {
    (k_factor(player) * (result - expected)) as i32
}

/// New ratings for every participant of a set, team one first.
///
/// The outcome is fractional: 6-4 credits team one with 0.6, not a full win. Each player
/// moves by their own K-factor, so the update is not zero-sum when experience differs.
/// A 0-0 set leaves everyone unchanged.
pub fn update_ratings(team_1: &[Player], team_2: &[Player], team_1_games: u32, team_2_games: u32) -> Vec<Player> {
    let total = team_1_games + team_2_games;
    if total == 0 {
        return team_1.iter().chain(team_2.iter()).cloned().collect();
    }
    let result_1 = f64::from(team_1_games) / f64::from(total);
    let result_2 = f64::from(team_2_games) / f64::from(total);

    let rating_1 = team_rating(team_1);
    let rating_2 = team_rating(team_2);
    let expected_1 = expected_score(rating_1, rating_2);
    let expected_2 = expected_score(rating_2, rating_1);

    let updated_1 = team_1.iter().map(|p| {
        let mut p = p.clone();
        p.rating += rating_delta(&p, result_1, expected_1);
        p
    });
    let updated_2 = team_2.iter().map(|p| {
        let mut p = p.clone();
        p.rating += rating_delta(&p, result_2, expected_2);
        p
    });
    updated_1.chain(updated_2).collect()
}
