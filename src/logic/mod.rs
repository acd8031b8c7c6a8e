//! Tournament business logic: pairing, rating, results, and round progression.

pub mod pairing;
pub mod progression;
pub mod rating;
pub mod results;

pub use pairing::{generate_round, RoundPlan, MAX_REPEAT_PASSES};
pub use progression::{Progress, SubmissionOutcome, TournamentEngine, TournamentOverview};
pub use rating::{expected_score, k_factor, team_rating, update_ratings};
pub use results::{finalize, finalize_with_byes, FinalResults, TOP_PERFORMERS};
