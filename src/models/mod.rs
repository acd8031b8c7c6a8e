//! Data structures for rotation tournaments: players, court sets, rounds, tournament document.

mod court_set;
mod player;
mod tournament;

pub use court_set::{CourtSet, Round, SetId, Team, TeamId, TeamSide};
pub use player::{ChangeId, Player, PlayerChange, PlayerId, PlayerStanding, INITIAL_RATING};
pub use tournament::{
    Tournament, TournamentConfig, TournamentError, TournamentId, TournamentState, UnpairedPolicy,
    Visibility, MIN_PLAYERS,
};
