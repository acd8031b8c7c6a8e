//! Round progression: registration, score submission, round transitions and finalization.
//!
//! Every operation is a read-modify-write of one tournament document. Saves are
//! compare-and-swap on the version that was read, so two requests racing on the same
//! tournament can never both generate a round; the loser gets `ConcurrentModification`.
//!
//! Player record updates (ratings, tournament wins and losses) are queued on the document in
//! the same save that causes them, then written to the player store one compare-and-swap at a
//! time. Whatever could not be written stays queued and is replayed by the next submission or
//! by `advance`; each change is applied to a player record at most once.

use crate::events::{EventBus, TournamentEvent};
use crate::logic::pairing::generate_round;
use crate::logic::rating::update_ratings;
use crate::logic::results::{finalize, finalize_with_byes, FinalResults};
use crate::models::{
    CourtSet, Player, PlayerChange, PlayerId, SetId, Tournament, TournamentConfig, TournamentError,
    TournamentId, TournamentState, UnpairedPolicy, Visibility,
};
use crate::store::{PlayerStore, StoreError, TournamentStore, Versioned};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::broadcast;

/// Past tournaments listed per player in the overview.
const PAST_LIMIT: usize = 10;

/// Compare-and-swap attempts per player change before reporting a conflict.
const MAX_CHANGE_ATTEMPTS: usize = 5;

/// Where the tournament stands after an accepted score.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Progress {
    /// Other sets of the round are still open.
    RoundInProgress { round: u32, remaining_sets: usize },
    /// The round finished and the next one was paired.
    NextRound { round: u32 },
    /// The last round finished and the tournament was finalized.
    Completed { results: FinalResults },
    /// The round finished but the transition failed; retry with `advance`.
    TransitionPending { round: u32, error: String },
}

/// Result of an accepted score submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub set_id: SetId,
    /// Participants with their new ratings, team one first.
    pub ratings: Vec<Player>,
    pub progress: Progress,
}

/// Tournaments relevant to one player.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentOverview {
    /// Scheduled later, not finished, and visible to the player. Soonest first.
    pub upcoming: Vec<Tournament>,
    /// Registered, started (by schedule) and not finished.
    pub current: Vec<Tournament>,
    /// Registered and finished, newest first.
    pub past: Vec<Tournament>,
}

fn store_error(e: StoreError) -> TournamentError {
    match e {
        StoreError::Conflict { .. } => TournamentError::ConcurrentModification,
        other => TournamentError::Store(other.to_string()),
    }
}

/// Orchestrates tournaments over a document store and a player store.
pub struct TournamentEngine<T, P> {
    tournaments: T,
    players: P,
    events: EventBus,
}

impl<T: TournamentStore, P: PlayerStore> TournamentEngine<T, P> {
    pub fn new(tournaments: T, players: P) -> Self {
        Self {
            tournaments,
            players,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TournamentEvent> {
        self.events.subscribe()
    }

    pub fn player_store(&self) -> &P {
        &self.players
    }

    pub fn tournament_store(&self) -> &T {
        &self.tournaments
    }

    async fn load(&self, id: TournamentId) -> Result<(Tournament, u64), TournamentError> {
        let stored = self.tournaments.load(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => TournamentError::TournamentNotFound(id),
            other => store_error(other),
        })?;
        let tournament = Tournament::from_document(stored.value)?;
        if tournament.id != id {
            return Err(TournamentError::MalformedRecord(format!(
                "document stored under {} has id {}",
                id, tournament.id
            )));
        }
        Ok((tournament, stored.version))
    }

    async fn save(&self, tournament: &Tournament, version: u64) -> Result<u64, TournamentError> {
        let doc = tournament.to_document()?;
        self.tournaments
            .save(tournament.id, doc, version)
            .await
            .map_err(store_error)
    }

    async fn player_record(&self, player_id: &str) -> Result<Versioned<Player>, TournamentError> {
        let record = self.players.get(player_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => TournamentError::PlayerNotFound(player_id.to_string()),
            other => store_error(other),
        })?;
        let player: Player = serde_json::from_value(record.value)
            .map_err(|e| TournamentError::MalformedRecord(format!("player {}: {}", player_id, e)))?;
        if player.id != player_id {
            return Err(TournamentError::MalformedRecord(format!(
                "player stored under {} has id {}",
                player_id, player.id
            )));
        }
        Ok(Versioned {
            version: record.version,
            value: player,
        })
    }

    /// Fetch and decode one player record.
    pub async fn player(&self, player_id: &str) -> Result<Player, TournamentError> {
        Ok(self.player_record(player_id).await?.value)
    }

    /// Fetch all players concurrently; the result keeps the order of `ids`.
    async fn fetch_players(&self, ids: &[PlayerId]) -> Result<Vec<Player>, TournamentError> {
        try_join_all(ids.iter().map(|id| self.player(id))).await
    }

    /// Read-modify-write one player record, re-reading when another writer got there first.
    async fn apply_change(&self, change: &PlayerChange) -> Result<Player, TournamentError> {
        for _ in 0..MAX_CHANGE_ATTEMPTS {
            let Versioned { version, value: mut player } = self.player_record(&change.player_id).await?;
            if !change.apply(&mut player) {
                return Ok(player);
            }
            match self.players.save(&player, version).await {
                Ok(_) => return Ok(player),
                Err(StoreError::Conflict { .. }) => {
                    log::debug!("Player {} changed concurrently, retrying change {}", player.id, change.id);
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(TournamentError::ConcurrentModification)
    }

    /// Write the document's queued player changes, then clear the queue.
    ///
    /// Returns the written players in queue order. On failure the queue is left as it is.
    async fn apply_pending(
        &self,
        mut tournament: Tournament,
        version: u64,
    ) -> Result<(Tournament, u64, Vec<Player>), TournamentError> {
        if tournament.pending_changes.is_empty() {
            return Ok((tournament, version, Vec::new()));
        }
        let written = try_join_all(tournament.pending_changes.iter().map(|c| self.apply_change(c)))
            .await
            .map_err(|e| {
                log::warn!(
                    "Tournament {}: {} player change(s) still pending: {}",
                    tournament.id,
                    tournament.pending_changes.len(),
                    e
                );
                e
            })?;
        tournament.pending_changes.clear();
        let version = self.save(&tournament, version).await?;
        Ok((tournament, version, written))
    }

    /// Return the stored player, creating it at the initial rating when missing.
    pub async fn ensure_player(&self, player_id: &str, name: &str) -> Result<Player, TournamentError> {
        match self.player(player_id).await {
            Ok(p) => Ok(p),
            Err(TournamentError::PlayerNotFound(_)) => {
                let player = Player::new(player_id, name);
                match self.players.insert(&player).await {
                    Ok(_) => {
                        log::info!("Created player {} ({})", player.id, player.name);
                        Ok(player)
                    }
                    Err(StoreError::AlreadyExists(_)) => self.player(player_id).await,
                    Err(e) => Err(store_error(e)),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_tournament(&self, config: TournamentConfig) -> Result<Tournament, TournamentError> {
        config.validate()?;
        self.player(config.creator_id.trim()).await?;
        let tournament = Tournament::new(config)?;
        self.tournaments
            .insert(tournament.id, tournament.to_document()?)
            .await
            .map_err(store_error)?;
        log::info!(
            "Created tournament {} ({} players, {} rounds, {} courts)",
            tournament.id,
            tournament.max_players,
            tournament.number_of_rounds,
            tournament.court_numbers.len()
        );
        self.events.publish(TournamentEvent::TournamentCreated {
            tournament_id: tournament.id,
        });
        Ok(tournament)
    }

    pub async fn tournament(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        Ok(self.load(id).await?.0)
    }

    pub async fn state(&self, id: TournamentId) -> Result<TournamentState, TournamentError> {
        Ok(self.load(id).await?.0.state())
    }

    /// Add a player to the roster. Filling the last place pairs round 1.
    ///
    /// If that first pairing fails, the registration still stands and the tournament stays in
    /// registration; `close_registration` retries it.
    pub async fn register_player(
        &self,
        id: TournamentId,
        player_id: &str,
        invite_code: Option<&str>,
    ) -> Result<Tournament, TournamentError> {
        let player_id = player_id.trim();
        let (mut tournament, version) = self.load(id).await?;
        tournament.check_registration(player_id, invite_code)?;
        self.player(player_id).await?;
        tournament.register(player_id, invite_code)?;
        let version = self.save(&tournament, version).await?;
        log::info!(
            "Player {} registered for tournament {} ({}/{})",
            player_id,
            id,
            tournament.registered_player_ids.len(),
            tournament.max_players
        );
        self.events.publish(TournamentEvent::PlayerRegistered {
            tournament_id: id,
            player_id: player_id.to_string(),
        });

        if tournament.is_registration_full() {
            match self.start_next_round(tournament.clone(), version).await {
                Ok((started, _)) => return Ok(started),
                Err(e) => log::warn!("Tournament {} is full but round 1 could not be paired: {}", id, e),
            }
        }
        Ok(tournament)
    }

    /// Operator action: stop registration and pair round 1 with whoever is registered.
    pub async fn close_registration(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        let (tournament, version) = self.load(id).await?;
        match tournament.state() {
            TournamentState::Registering => {}
            TournamentState::Completed => return Err(TournamentError::TournamentAlreadyComplete),
            _ => return Err(TournamentError::RegistrationClosed),
        }
        Ok(self.start_next_round(tournament, version).await?.0)
    }

    /// Record a set's score, update ratings, and move the tournament on when the round is done.
    ///
    /// If the new ratings cannot be written the error is returned; the score stands and the
    /// ratings stay queued for the next submission or `advance`.
    pub async fn submit_score(
        &self,
        id: TournamentId,
        set_id: SetId,
        team_1_games: u32,
        team_2_games: u32,
    ) -> Result<SubmissionOutcome, TournamentError> {
        let (tournament, version) = self.load(id).await?;
        let set = tournament.check_submission(set_id, team_1_games, team_2_games)?.clone();
        // Ratings from earlier sets must be stored before new ones are computed.
        let (mut tournament, version, _) = self.apply_pending(tournament, version).await?;

        let participants: Vec<PlayerId> = set.player_ids().cloned().collect();
        let participants = self.fetch_players(&participants).await?;
        let (team_1, team_2) = participants.split_at(2);
        let rated = update_ratings(team_1, team_2, team_1_games, team_2_games);

        tournament
            .find_set_mut(set_id)
            .ok_or(TournamentError::UnknownSet(set_id))?
            .record_score(team_1_games, team_2_games, Utc::now());
        tournament.pending_changes = participants
            .iter()
            .zip(&rated)
            .map(|(before, after)| PlayerChange::rating(before.id.clone(), after.rating - before.rating))
            .collect();
        let version = self.save(&tournament, version).await?;
        log::info!(
            "Tournament {} round {} court {}: {}",
            id,
            set.round_number,
            set.court_number,
            tournament.find_set(set_id).map(CourtSet::score_string).unwrap_or_default()
        );
        self.events.publish(TournamentEvent::ScoreRecorded {
            tournament_id: id,
            set_id,
            team_1_games,
            team_2_games,
        });

        let (tournament, version, ratings) = self.apply_pending(tournament, version).await?;

        let round = set.round_number;
        let remaining_sets = remaining_sets(&tournament, round);
        let progress = if remaining_sets > 0 {
            Progress::RoundInProgress { round, remaining_sets }
        } else {
            match self.complete_round(tournament, version).await {
                Ok(progress) => progress,
                Err(e) => self.stalled(id, round, &e),
            }
        };

        Ok(SubmissionOutcome {
            set_id,
            ratings,
            progress,
        })
    }

    /// Finish what an earlier request left undone: queued player changes, then a round transition.
    pub async fn advance(&self, id: TournamentId) -> Result<Progress, TournamentError> {
        let (tournament, version) = self.load(id).await?;
        let pending = !tournament.pending_changes.is_empty();
        match tournament.state() {
            TournamentState::RoundComplete { .. } => {}
            TournamentState::Registering => return Err(TournamentError::RoundNotComplete(0)),
            TournamentState::RoundInProgress { round } if !pending => {
                return Err(TournamentError::RoundNotComplete(round))
            }
            TournamentState::Completed if !pending => return Err(TournamentError::TournamentAlreadyComplete),
            TournamentState::RoundInProgress { .. } | TournamentState::Completed => {}
        }
        let round = tournament.rounds.len() as u32;
        self.resume(tournament, version).await.map_err(|e| {
            self.stalled(id, round, &e);
            e
        })
    }

    async fn resume(&self, tournament: Tournament, version: u64) -> Result<Progress, TournamentError> {
        let (tournament, version, _) = self.apply_pending(tournament, version).await?;
        match tournament.state() {
            TournamentState::RoundComplete { .. } => self.complete_round(tournament, version).await,
            TournamentState::RoundInProgress { round } => Ok(Progress::RoundInProgress {
                round,
                remaining_sets: remaining_sets(&tournament, round),
            }),
            TournamentState::Completed => Ok(Progress::Completed {
                results: compute_results(&tournament),
            }),
            TournamentState::Registering => Err(TournamentError::RoundNotComplete(0)),
        }
    }

    /// Live standings (final once the tournament is completed).
    pub async fn standings(&self, id: TournamentId) -> Result<FinalResults, TournamentError> {
        let (tournament, _) = self.load(id).await?;
        Ok(compute_results(&tournament))
    }

    /// Upcoming, current and past tournaments for a player, as of `now`.
    pub async fn overview(&self, player_id: &str, now: DateTime<Utc>) -> Result<TournamentOverview, TournamentError> {
        let docs = self.tournaments.list().await.map_err(store_error)?;
        let tournaments = docs
            .into_iter()
            .map(|d| Tournament::from_document(d.value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut overview = TournamentOverview::default();
        for t in tournaments {
            let registered = t.is_registered(player_id);
            if t.is_completed {
                if registered {
                    overview.past.push(t);
                }
            } else if t.scheduled_at > now {
                if registered || t.visibility == Visibility::Public {
                    overview.upcoming.push(t);
                }
            } else if registered {
                overview.current.push(t);
            }
        }
        overview.upcoming.sort_by_key(|t| t.scheduled_at);
        overview.current.sort_by_key(|t| t.scheduled_at);
        overview.past.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        overview.past.truncate(PAST_LIMIT);
        Ok(overview)
    }

    /// Run the step after a finished round: pair the next one or finalize.
    async fn complete_round(&self, tournament: Tournament, version: u64) -> Result<Progress, TournamentError> {
        let round = tournament.rounds.len() as u32;
        if round < tournament.number_of_rounds {
            let (tournament, _) = self.start_next_round(tournament, version).await?;
            Ok(Progress::NextRound {
                round: tournament.rounds.len() as u32,
            })
        } else {
            let results = self.finalize(tournament, version).await?;
            Ok(Progress::Completed { results })
        }
    }

    /// A failed transition leaves the work for `advance`.
    fn stalled(&self, id: TournamentId, round: u32, error: &TournamentError) -> Progress {
        log::warn!("Tournament {} could not move on from round {}: {}", id, round, error);
        self.events.publish(TournamentEvent::TransitionStalled {
            tournament_id: id,
            round_number: round,
            reason: error.to_string(),
        });
        Progress::TransitionPending {
            round,
            error: error.to_string(),
        }
    }

    /// Pair the next round with current ratings and the full partner history, then save it.
    async fn start_next_round(&self, mut tournament: Tournament, version: u64) -> Result<(Tournament, u64), TournamentError> {
        let next = tournament.rounds.len() as u32 + 1;
        let players = self.fetch_players(&tournament.registered_player_ids).await?;
        let history: Vec<CourtSet> = tournament.all_sets().cloned().collect();
        let plan = generate_round(&players, &tournament.court_numbers, &history, next)?;
        let sets = plan.sets.clone();
        let byes = plan.byes.clone();
        tournament.push_round(plan.into_round())?;
        let version = self.save(&tournament, version).await?;

        log::info!(
            "Tournament {}: round {} paired on {} court(s), {} bye(s)",
            tournament.id,
            next,
            sets.len(),
            byes.len()
        );
        self.events.publish(TournamentEvent::RoundGenerated {
            tournament_id: tournament.id,
            round_number: next,
            sets,
            byes,
        });
        Ok((tournament, version))
    }

    /// Close the tournament: store top performers, then credit tournament wins and losses.
    async fn finalize(&self, mut tournament: Tournament, version: u64) -> Result<FinalResults, TournamentError> {
        let results = compute_results(&tournament);

        tournament.top_performers = results.top_performers.clone();
        tournament.is_completed = true;
        tournament.pending_changes = tournament
            .registered_player_ids
            .iter()
            .map(|pid| PlayerChange::result(pid.clone(), results.is_champion(pid)))
            .collect();
        let version = self.save(&tournament, version).await?;

        log::info!("Tournament {} completed\n{}", tournament.id, results.report());
        self.events.publish(TournamentEvent::TournamentCompleted {
            tournament_id: tournament.id,
            results: results.clone(),
        });

        self.apply_pending(tournament, version).await?;
        Ok(results)
    }
}

fn remaining_sets(tournament: &Tournament, round: u32) -> usize {
    tournament
        .round(round)
        .map(|r| r.sets.len() - r.completed_sets())
        .unwrap_or(0)
}

/// Standings under the tournament's bye policy.
fn compute_results(tournament: &Tournament) -> FinalResults {
    let sets: Vec<CourtSet> = tournament.all_sets().cloned().collect();
    match tournament.unpaired_policy {
        UnpairedPolicy::Drop => finalize(&tournament.registered_player_ids, &sets),
        UnpairedPolicy::ByeCredit => {
            let byes: Vec<PlayerId> = tournament.all_byes().cloned().collect();
            finalize_with_byes(&tournament.registered_player_ids, &sets, &byes)
        }
    }
}

