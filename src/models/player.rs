//! Player record and per-tournament standing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a player in the external player store.
pub type PlayerId = String;

/// Rating every new player starts with.
pub const INITIAL_RATING: i32 = 1000;

/// Identifier of one pending change to a player record.
pub type ChangeId = Uuid;

/// Applied change ids remembered per player.
const APPLIED_CHANGES_KEPT: usize = 32;

/// Standing of one player inside a single tournament (for API / finalization).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub player_id: PlayerId,
    /// Sets won by the player's team (plus bye credits, if enabled).
    pub wins: u32,
    /// Games won by the player's team across every set played.
    pub points: u32,
    pub sets_played: u32,
    pub byes: u32,
}

impl PlayerStanding {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            ..Self::default()
        }
    }

    /// Ranking key: more wins first, then more points.
    pub fn score(&self) -> (u32, u32) {
        (self.wins, self.points)
    }
}

/// A player as stored in the player store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_rating")]
    pub rating: i32,
    /// Tournaments won (tied for the top result).
    #[serde(default)]
    pub wins: u32,
    /// Tournaments finished without a top result.
    #[serde(default)]
    pub losses: u32,
    /// Most recent changes written to this record, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_changes: Vec<ChangeId>,
}

fn default_rating() -> i32 {
    INITIAL_RATING
}

impl Player {
    /// Create a new player at the initial rating with no history.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rating: INITIAL_RATING,
            wins: 0,
            losses: 0,
            applied_changes: Vec::new(),
        }
    }

    /// Same player with a different rating (handy for seeding tests and imports).
    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    /// Tournaments this player has finished.
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }
}

/// An additive update to one player record, queued on a tournament until it is written.
///
/// Applying records the change id on the player, so replaying a change that already
/// reached the store leaves the record alone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerChange {
    pub id: ChangeId,
    pub player_id: PlayerId,
    #[serde(default)]
    pub rating_delta: i32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

impl PlayerChange {
    /// Rating movement from one set.
    pub fn rating(player_id: impl Into<PlayerId>, rating_delta: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            rating_delta,
            wins: 0,
            losses: 0,
        }
    }

    /// Tournament win or loss credited at finalization.
    pub fn result(player_id: impl Into<PlayerId>, champion: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            rating_delta: 0,
            wins: u32::from(champion),
            losses: u32::from(!champion),
        }
    }

    /// Apply to `player`. Returns false when the change was already applied.
    pub fn apply(&self, player: &mut Player) -> bool {
        if player.applied_changes.contains(&self.id) {
            return false;
        }
        player.rating += self.rating_delta;
        player.wins += self.wins;
        player.losses += self.losses;
        player.applied_changes.push(self.id);
        if player.applied_changes.len() > APPLIED_CHANGES_KEPT {
            let excess = player.applied_changes.len() - APPLIED_CHANGES_KEPT;
            player.applied_changes.drain(..excess);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_is_applied_once() {
        let mut player = Player::new("p1", "Ana");
        let change = PlayerChange::rating("p1", 16);
        assert!(change.apply(&mut player));
        assert!(!change.apply(&mut player));
        assert_eq!(player.rating, 1016);
    }

    #[test]
    fn result_credits_a_win_or_a_loss() {
        let mut player = Player::new("p1", "Ana");
        PlayerChange::result("p1", true).apply(&mut player);
        PlayerChange::result("p1", false).apply(&mut player);
        assert_eq!((player.wins, player.losses, player.rating), (1, 1, 1000));
    }

    #[test]
    fn applied_change_history_is_bounded() {
        let mut player = Player::new("p1", "Ana");
        for _ in 0..40 {
            PlayerChange::rating("p1", 1).apply(&mut player);
        }
        assert_eq!(player.rating, 1040);
        assert_eq!(player.applied_changes.len(), APPLIED_CHANGES_KEPT);
    }
}
