//! Tournament, its configuration, derived state, and the error type shared by every operation.

use crate::models::court_set::{CourtSet, Round, SetId};
use crate::models::player::{PlayerChange, PlayerId};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

/// Smallest roster that can fill one court.
pub const MIN_PLAYERS: usize = 4;

/// Length of generated invite codes for private tournaments.
const INVITE_CODE_LEN: usize = 6;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Pairing needs at least 4 players and one court per 4 players.
    InsufficientPlayers { players: usize, courts: usize },
    /// No set with this id in the tournament.
    UnknownSet(SetId),
    /// The set belongs to another round than the one being played.
    SetNotInCurrentRound { set_round: u32, current_round: u32 },
    /// The set already has a final score.
    SetAlreadyCompleted(SetId),
    /// The tournament is finalized; nothing can change anymore.
    TournamentAlreadyComplete,
    /// The document changed between read and write. Safe to retry.
    ConcurrentModification,
    /// Tournament settings are unusable.
    InvalidConfiguration(String),
    /// A stored record failed to decode or violates the document invariants.
    MalformedRecord(String),
    TournamentNotFound(TournamentId),
    PlayerNotFound(PlayerId),
    /// A blank player id was given.
    EmptyPlayerId,
    AlreadyRegistered(PlayerId),
    TournamentFull { capacity: usize },
    /// Rounds have started; the roster is frozen.
    RegistrationClosed,
    InvalidInviteCode,
    /// A team reported more games than a set can hold.
    InvalidScore { team_1_games: u32, team_2_games: u32, max_games: u32 },
    /// A round transition was requested while no round is waiting for one.
    RoundNotComplete(u32),
    /// A closed tag (visibility, notification kind) had an unknown value.
    UnknownTag { kind: &'static str, value: String },
    /// Backing store failure.
    Store(String),
}

impl TournamentError {
    /// Only write conflicts are worth retrying; everything else is final for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TournamentError::ConcurrentModification)
    }
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InsufficientPlayers { players, courts } => write!(
                f,
                "Need at least 4 players and one court per 4 players (have {} players, {} courts)",
                players, courts
            ),
            TournamentError::UnknownSet(id) => write!(f, "Set {} not found", id),
            TournamentError::SetNotInCurrentRound { set_round, current_round } => write!(
                f,
                "Set belongs to round {} but round {} is being played",
                set_round, current_round
            ),
            TournamentError::SetAlreadyCompleted(id) => write!(f, "Set {} already has a score", id),
            TournamentError::TournamentAlreadyComplete => write!(f, "Tournament is already complete"),
            TournamentError::ConcurrentModification => {
                write!(f, "Tournament was modified concurrently, retry the request")
            }
            TournamentError::InvalidConfiguration(detail) => write!(f, "Invalid configuration: {}", detail),
            TournamentError::MalformedRecord(detail) => write!(f, "Malformed record: {}", detail),
            TournamentError::TournamentNotFound(id) => write!(f, "Tournament {} not found", id),
            TournamentError::PlayerNotFound(id) => write!(f, "Player {} not found", id),
            TournamentError::EmptyPlayerId => write!(f, "Player id must not be empty"),
            TournamentError::AlreadyRegistered(id) => write!(f, "Player {} is already registered", id),
            TournamentError::TournamentFull { capacity } => {
                write!(f, "Tournament is already full ({} players)", capacity)
            }
            TournamentError::RegistrationClosed => write!(f, "Registration is closed"),
            TournamentError::InvalidInviteCode => write!(f, "Invalid invite code"),
            TournamentError::InvalidScore { team_1_games, team_2_games, max_games } => write!(
                f,
                "Score {}-{} is not possible, a team wins at most {} games",
                team_1_games, team_2_games, max_games
            ),
            TournamentError::RoundNotComplete(round) => write!(f, "Round {} is not waiting for a transition", round),
            TournamentError::UnknownTag { kind, value } => write!(f, "Unknown {} '{}'", kind, value),
            TournamentError::Store(detail) => write!(f, "Store error: {}", detail),
        }
    }
}

impl std::error::Error for TournamentError {}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Who can find and join a tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    /// Joining requires the tournament's invite code.
    Private,
}

impl FromStr for Visibility {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(TournamentError::UnknownTag {
                kind: "visibility",
                value: s.to_string(),
            }),
        }
    }
}

/// What happens to players the pairing cannot place on a court.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpairedPolicy {
    /// Sit out without compensation (the byes are still recorded on the round).
    #[default]
    Drop,
    /// Each bye counts as one set win in the final standings.
    ByeCredit,
}

/// Settings chosen when a tournament is created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    /// Organizer; registered automatically.
    pub creator_id: PlayerId,
    #[serde(default)]
    pub location: String,
    #[serde(default = "chrono::Utc::now")]
    pub scheduled_at: DateTime<Utc>,
    pub court_numbers: Vec<String>,
    pub max_players: usize,
    #[serde(default = "default_number_of_rounds")]
    pub number_of_rounds: u32,
    #[serde(default = "default_games_per_set")]
    pub games_per_set: u32,
    /// A set tied at `games_per_set` is decided by one extra tie-break game.
    #[serde(default = "default_tie_break")]
    pub tie_break: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub unpaired_policy: UnpairedPolicy,
}

fn default_number_of_rounds() -> u32 {
    3
}

fn default_games_per_set() -> u32 {
    6
}

fn default_tie_break() -> bool {
    true
}

impl TournamentConfig {
    /// Config with the default format (3 rounds of 6-game sets with tie-break), public.
    pub fn new(creator_id: impl Into<PlayerId>, court_numbers: Vec<String>, max_players: usize) -> Self {
        Self {
            creator_id: creator_id.into(),
            location: String::new(),
            scheduled_at: Utc::now(),
            court_numbers,
            max_players,
            number_of_rounds: default_number_of_rounds(),
            games_per_set: default_games_per_set(),
            tie_break: default_tie_break(),
            visibility: Visibility::Public,
            invite_code: None,
            unpaired_policy: UnpairedPolicy::Drop,
        }
    }

    pub fn validate(&self) -> Result<(), TournamentError> {
        validate_settings(
            &self.creator_id,
            &self.court_numbers,
            self.max_players,
            self.number_of_rounds,
            self.games_per_set,
        )
    }
}

fn validate_settings(
    creator_id: &str,
    court_numbers: &[String],
    max_players: usize,
    number_of_rounds: u32,
    games_per_set: u32,
) -> Result<(), TournamentError> {
    let invalid = |detail: &str| Err(TournamentError::InvalidConfiguration(detail.to_string()));
    if creator_id.trim().is_empty() {
        return invalid("creator id must not be empty");
    }
    if max_players < MIN_PLAYERS {
        return invalid("max players must be at least 4");
    }
    if number_of_rounds == 0 {
        return invalid("number of rounds must be positive");
    }
    if games_per_set == 0 {
        return invalid("games per set must be positive");
    }
    if court_numbers.is_empty() {
        return invalid("at least one court is required");
    }
    if court_numbers.iter().any(|c| c.trim().is_empty()) {
        return invalid("court labels must not be empty");
    }
    let unique: HashSet<_> = court_numbers.iter().collect();
    if unique.len() != court_numbers.len() {
        return invalid("court labels must be unique");
    }
    if court_numbers.len() < max_players / MIN_PLAYERS {
        return Err(TournamentError::InvalidConfiguration(format!(
            "{} places need at least {} courts, {} configured",
            max_players,
            max_players / MIN_PLAYERS,
            court_numbers.len()
        )));
    }
    Ok(())
}

fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Current phase of the tournament, derived from the document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TournamentState {
    /// Collecting players; no round generated yet.
    Registering,
    /// Scores are being entered for this round.
    RoundInProgress { round: u32 },
    /// Every set of this round is scored but the next step has not happened (stalled transition).
    RoundComplete { round: u32 },
    /// Finalized; terminal.
    Completed,
}

/// The tournament document: roster, settings, rounds and final result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub creator_id: PlayerId,
    #[serde(default)]
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub court_numbers: Vec<String>,
    pub max_players: usize,
    pub number_of_rounds: u32,
    pub games_per_set: u32,
    #[serde(default)]
    pub tie_break: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub unpaired_policy: UnpairedPolicy,
    /// Roster in registration order.
    #[serde(default)]
    pub registered_player_ids: Vec<PlayerId>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub is_completed: bool,
    /// Up to three best-ranked players, written once at finalization.
    #[serde(default)]
    pub top_performers: Vec<PlayerId>,
    /// Player record updates committed with this document but not yet written to the player store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_changes: Vec<PlayerChange>,
}

impl Tournament {
    /// Create a tournament in registration with the creator already on the roster.
    pub fn new(config: TournamentConfig) -> Result<Self, TournamentError> {
        config.validate()?;
        let invite_code = match config.visibility {
            Visibility::Public => None,
            Visibility::Private => Some(
                config
                    .invite_code
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(generate_invite_code),
            ),
        };
        Ok(Self {
            id: Uuid::new_v4(),
            registered_player_ids: vec![config.creator_id.trim().to_string()],
            creator_id: config.creator_id.trim().to_string(),
            location: config.location,
            scheduled_at: config.scheduled_at,
            created_at: Utc::now(),
            court_numbers: config.court_numbers,
            max_players: config.max_players,
            number_of_rounds: config.number_of_rounds,
            games_per_set: config.games_per_set,
            tie_break: config.tie_break,
            visibility: config.visibility,
            invite_code,
            unpaired_policy: config.unpaired_policy,
            rounds: Vec::new(),
            is_completed: false,
            top_performers: Vec::new(),
            pending_changes: Vec::new(),
        })
    }

    /// Decode a stored document, rejecting anything that breaks the tournament invariants.
    pub fn from_document(doc: serde_json::Value) -> Result<Self, TournamentError> {
        let tournament: Tournament = serde_json::from_value(doc)
            .map_err(|e| TournamentError::MalformedRecord(format!("tournament: {}", e)))?;
        tournament.validate()?;
        Ok(tournament)
    }

    pub fn to_document(&self) -> Result<serde_json::Value, TournamentError> {
        serde_json::to_value(self).map_err(|e| TournamentError::MalformedRecord(format!("tournament: {}", e)))
    }

    /// Structural invariants of a stored document.
    pub fn validate(&self) -> Result<(), TournamentError> {
        let malformed = |detail: String| Err(TournamentError::MalformedRecord(format!("tournament {}: {}", self.id, detail)));

        validate_settings(
            &self.creator_id,
            &self.court_numbers,
            self.max_players,
            self.number_of_rounds,
            self.games_per_set,
        )
        .or_else(|e| malformed(e.to_string()))?;

        let roster: HashSet<&str> = self.registered_player_ids.iter().map(String::as_str).collect();
        if roster.len() != self.registered_player_ids.len() {
            return malformed("duplicate registered player".to_string());
        }
        if self.registered_player_ids.len() > self.max_players {
            return malformed(format!(
                "{} players registered for {} places",
                self.registered_player_ids.len(),
                self.max_players
            ));
        }
        if self.rounds.len() > self.number_of_rounds as usize {
            return malformed(format!("{} rounds for a {}-round format", self.rounds.len(), self.number_of_rounds));
        }
        if self.top_performers.len() > 3 {
            return malformed("more than 3 top performers".to_string());
        }
        if let Some(change) = self.pending_changes.iter().find(|c| !roster.contains(c.player_id.as_str())) {
            return malformed(format!("pending change {} for unregistered player {}", change.id, change.player_id));
        }

        for (idx, round) in self.rounds.iter().enumerate() {
            let expected = idx as u32 + 1;
            if round.round_number != expected {
                return malformed(format!("round {} found where round {} belongs", round.round_number, expected));
            }
            if idx + 1 < self.rounds.len() && !round.is_complete() {
                return malformed(format!("round {} is open but a later round exists", expected));
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for set in &round.sets {
                if set.round_number != expected {
                    return malformed(format!("set {} claims round {} inside round {}", set.id, set.round_number, expected));
                }
                for team in &set.teams {
                    if team.player_ids[0] == team.player_ids[1] {
                        return malformed(format!("team {} pairs a player with themselves", team.id));
                    }
                }
                for pid in set.player_ids() {
                    if !roster.contains(pid.as_str()) {
                        return malformed(format!("set {} references unregistered player {}", set.id, pid));
                    }
                    if !seen.insert(pid.as_str()) {
                        return malformed(format!("player {} plays twice in round {}", pid, expected));
                    }
                }
            }
        }

        if self.is_completed {
            let finished = self.rounds.len() == self.number_of_rounds as usize
                && self.rounds.iter().all(Round::is_complete);
            if !finished {
                return malformed("marked completed before its last round finished".to_string());
            }
        }
        Ok(())
    }

    /// Smallest round number with an open set, or one past the last round when all are done.
    pub fn current_round_number(&self) -> u32 {
        self.rounds
            .iter()
            .find(|r| !r.is_complete())
            .map(|r| r.round_number)
            .unwrap_or(self.rounds.len() as u32 + 1)
    }

    pub fn state(&self) -> TournamentState {
        if self.is_completed {
            return TournamentState::Completed;
        }
        if self.rounds.is_empty() {
            return TournamentState::Registering;
        }
        let current = self.current_round_number();
        if current as usize <= self.rounds.len() {
            TournamentState::RoundInProgress { round: current }
        } else {
            TournamentState::RoundComplete {
                round: self.rounds.len() as u32,
            }
        }
    }

    pub fn round(&self, round_number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_number == round_number)
    }

    /// Every set ever generated, oldest round first.
    pub fn all_sets(&self) -> impl Iterator<Item = &CourtSet> {
        self.rounds.iter().flat_map(|r| r.sets.iter())
    }

    /// Every bye ever recorded, one entry per round sat out.
    pub fn all_byes(&self) -> impl Iterator<Item = &PlayerId> {
        self.rounds.iter().flat_map(|r| r.byes.iter())
    }

    pub fn find_set(&self, set_id: SetId) -> Option<&CourtSet> {
        self.all_sets().find(|s| s.id == set_id)
    }

    pub fn find_set_mut(&mut self, set_id: SetId) -> Option<&mut CourtSet> {
        self.rounds
            .iter_mut()
            .flat_map(|r| r.sets.iter_mut())
            .find(|s| s.id == set_id)
    }

    pub fn is_registered(&self, player_id: &str) -> bool {
        self.registered_player_ids.iter().any(|p| p == player_id)
    }

    pub fn is_registration_full(&self) -> bool {
        self.registered_player_ids.len() >= self.max_players
    }

    /// Check whether `player_id` may join with the given invite code, without changing anything.
    pub fn check_registration(&self, player_id: &str, invite_code: Option<&str>) -> Result<(), TournamentError> {
        if player_id.trim().is_empty() {
            return Err(TournamentError::EmptyPlayerId);
        }
        if self.is_completed {
            return Err(TournamentError::TournamentAlreadyComplete);
        }
        if !self.rounds.is_empty() {
            return Err(TournamentError::RegistrationClosed);
        }
        if self.is_registered(player_id) {
            return Err(TournamentError::AlreadyRegistered(player_id.to_string()));
        }
        if self.is_registration_full() {
            return Err(TournamentError::TournamentFull {
                capacity: self.max_players,
            });
        }
        if self.visibility == Visibility::Private {
            let given = invite_code.map(str::trim);
            if given.is_none() || given != self.invite_code.as_deref() {
                return Err(TournamentError::InvalidInviteCode);
            }
        }
        Ok(())
    }

    /// Add a player to the roster (valid while registering and not full).
    pub fn register(&mut self, player_id: impl Into<PlayerId>, invite_code: Option<&str>) -> Result<(), TournamentError> {
        let player_id = player_id.into();
        let player_id = player_id.trim();
        self.check_registration(player_id, invite_code)?;
        self.registered_player_ids.push(player_id.to_string());
        Ok(())
    }

    /// Most games one team can win in a set.
    pub fn max_games_per_team(&self) -> u32 {
        if self.tie_break {
            self.games_per_set + 1
        } else {
            self.games_per_set
        }
    }

    /// Validate a score submission for `set_id` against the current document. No mutation.
    pub fn check_submission(&self, set_id: SetId, team_1_games: u32, team_2_games: u32) -> Result<&CourtSet, TournamentError> {
        let set = self.find_set(set_id).ok_or(TournamentError::UnknownSet(set_id))?;
        if self.is_completed {
            return Err(TournamentError::TournamentAlreadyComplete);
        }
        if set.is_completed {
            return Err(TournamentError::SetAlreadyCompleted(set_id));
        }
        let current_round = self.current_round_number();
        if set.round_number != current_round {
            return Err(TournamentError::SetNotInCurrentRound {
                set_round: set.round_number,
                current_round,
            });
        }
        let max_games = self.max_games_per_team();
        if team_1_games > max_games || team_2_games > max_games {
            return Err(TournamentError::InvalidScore {
                team_1_games,
                team_2_games,
                max_games,
            });
        }
        Ok(set)
    }

    /// Append the next round. Rounds are only ever added at the end, and never after completion.
    pub fn push_round(&mut self, round: Round) -> Result<(), TournamentError> {
        if self.is_completed {
            return Err(TournamentError::TournamentAlreadyComplete);
        }
        let expected = self.rounds.len() as u32 + 1;
        if round.round_number != expected || expected > self.number_of_rounds {
            return Err(TournamentError::InvalidConfiguration(format!(
                "round {} cannot follow round {} in a {}-round format",
                round.round_number,
                expected - 1,
                self.number_of_rounds
            )));
        }
        self.rounds.push(round);
        Ok(())
    }
}
