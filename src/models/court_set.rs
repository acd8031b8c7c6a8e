//! Court set (one match), Team, and Round for 2v2 play.

use crate::models::player::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a set.
pub type SetId = Uuid;

/// Unique identifier for a team (lives only as long as its set).
pub type TeamId = Uuid;

/// Which side of a set a team plays on.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    #[default]
    One,
    Two,
}

impl TeamSide {
    pub fn index(self) -> usize {
        match self {
            TeamSide::One => 0,
            TeamSide::Two => 1,
        }
    }
}

/// Two players sharing a side of the court.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub player_ids: [PlayerId; 2],
    #[serde(default)]
    pub games_won: u32,
}

impl Team {
    pub fn new(first: PlayerId, second: PlayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_ids: [first, second],
            games_won: 0,
        }
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.player_ids.iter().any(|p| p == player_id)
    }
}

/// A single court's match within a round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtSet {
    pub id: SetId,
    pub round_number: u32,
    /// Court label as configured on the tournament (e.g. "3" or "Center").
    pub court_number: String,
    pub teams: [Team; 2],
    #[serde(default)]
    pub is_completed: bool,
    /// None until a score is recorded.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CourtSet {
    pub fn new(round_number: u32, court_number: impl Into<String>, team_1: Team, team_2: Team) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_number,
            court_number: court_number.into(),
            teams: [team_1, team_2],
            is_completed: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn team(&self, side: TeamSide) -> &Team {
        &self.teams[side.index()]
    }

    /// All four player ids, team one first.
    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.teams.iter().flat_map(|t| t.player_ids.iter())
    }

    /// Side of the team the player plays on, if they play in this set.
    pub fn side_of(&self, player_id: &str) -> Option<TeamSide> {
        if self.teams[0].contains(player_id) {
            Some(TeamSide::One)
        } else if self.teams[1].contains(player_id) {
            Some(TeamSide::Two)
        } else {
            None
        }
    }

    /// Winning side of a completed set. None while open or when games are level.
    pub fn winner(&self) -> Option<TeamSide> {
        if !self.is_completed {
            return None;
        }
        let (one, two) = (self.teams[0].games_won, self.teams[1].games_won);
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => Some(TeamSide::One),
            std::cmp::Ordering::Less => Some(TeamSide::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Write the final score and close the set. Callers validate before calling this.
    pub fn record_score(&mut self, team_1_games: u32, team_2_games: u32, at: DateTime<Utc>) {
        self.teams[0].games_won = team_1_games;
        self.teams[1].games_won = team_2_games;
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub fn score_string(&self) -> String {
        format!("{} - {}", self.teams[0].games_won, self.teams[1].games_won)
    }
}

/// One full cycle of simultaneous court sets.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_number: u32,
    pub sets: Vec<CourtSet>,
    /// Players left out of this round's pairing.
    #[serde(default)]
    pub byes: Vec<PlayerId>,
}

impl Round {
    pub fn is_complete(&self) -> bool {
        self.sets.iter().all(|s| s.is_completed)
    }

    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.is_completed).count()
    }
}
