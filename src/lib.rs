//! Rotation tournament organizer: library with models, progression engine and store interfaces.

pub mod events;
pub mod logic;
pub mod models;
pub mod store;

pub use events::{EventBus, NotificationKind, TournamentEvent};
pub use logic::{
    finalize, finalize_with_byes, generate_round, update_ratings, FinalResults, Progress, RoundPlan,
    SubmissionOutcome, TournamentEngine, TournamentOverview,
};
pub use models::{
    ChangeId, CourtSet, Player, PlayerChange, PlayerId, PlayerStanding, Round, SetId, Team, TeamId, TeamSide, Tournament,
    TournamentConfig, TournamentError, TournamentId, TournamentState, UnpairedPolicy, Visibility,
    INITIAL_RATING, MIN_PLAYERS,
};
pub use store::{MemoryPlayerStore, MemoryTournamentStore, PlayerStore, StoreError, TournamentStore, Versioned};
