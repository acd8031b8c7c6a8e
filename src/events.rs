//! Notifications published after every tournament transition.

use crate::logic::FinalResults;
use crate::models::{CourtSet, PlayerId, SetId, TournamentError, TournamentId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::broadcast;

/// Events kept for slow subscribers before they start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Kind of notification a player receives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new round was paired; players learn their court and partner.
    NewPairing,
    ScoreSubmission,
    MatchCompletion,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NewPairing => "new_pairing",
            NotificationKind::ScoreSubmission => "score_submission",
            NotificationKind::MatchCompletion => "match_completion",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_pairing" => Ok(NotificationKind::NewPairing),
            "score_submission" => Ok(NotificationKind::ScoreSubmission),
            "match_completion" => Ok(NotificationKind::MatchCompletion),
            other => Err(TournamentError::UnknownTag {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

/// A state change of one tournament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentEvent {
    TournamentCreated {
        tournament_id: TournamentId,
    },
    PlayerRegistered {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },
    RoundGenerated {
        tournament_id: TournamentId,
        round_number: u32,
        sets: Vec<CourtSet>,
        byes: Vec<PlayerId>,
    },
    ScoreRecorded {
        tournament_id: TournamentId,
        set_id: SetId,
        team_1_games: u32,
        team_2_games: u32,
    },
    /// The round transition failed; the tournament waits in `RoundComplete` for a retry.
    TransitionStalled {
        tournament_id: TournamentId,
        round_number: u32,
        reason: String,
    },
    TournamentCompleted {
        tournament_id: TournamentId,
        results: FinalResults,
    },
}

impl TournamentEvent {
    pub fn tournament_id(&self) -> TournamentId {
        match self {
            TournamentEvent::TournamentCreated { tournament_id }
            | TournamentEvent::PlayerRegistered { tournament_id, .. }
            | TournamentEvent::RoundGenerated { tournament_id, .. }
            | TournamentEvent::ScoreRecorded { tournament_id, .. }
            | TournamentEvent::TransitionStalled { tournament_id, .. }
            | TournamentEvent::TournamentCompleted { tournament_id, .. } => *tournament_id,
        }
    }

    /// Player-facing notification for this event, if players should hear about it.
    pub fn notification(&self) -> Option<NotificationKind> {
        match self {
            TournamentEvent::RoundGenerated { .. } => Some(NotificationKind::NewPairing),
            TournamentEvent::ScoreRecorded { .. } => Some(NotificationKind::ScoreSubmission),
            TournamentEvent::TournamentCompleted { .. } => Some(NotificationKind::MatchCompletion),
            TournamentEvent::TournamentCreated { .. }
            | TournamentEvent::PlayerRegistered { .. }
            | TournamentEvent::TransitionStalled { .. } => None,
        }
    }
}

/// Fan-out of tournament events to any number of subscribers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<TournamentEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TournamentEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: TournamentEvent) {
        log::debug!("Event for tournament {}: {:?}", event.tournament_id(), event.notification());
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn notification_kind_round_trips_known_tags() {
        for kind in [
            NotificationKind::NewPairing,
            NotificationKind::ScoreSubmission,
            NotificationKind::MatchCompletion,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_notification_kind_is_rejected() {
        let err = "friend_request".parse::<NotificationKind>().unwrap_err();
        assert!(matches!(err, TournamentError::UnknownTag { kind: "notification kind", .. }));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(TournamentEvent::TournamentCreated {
            tournament_id: Uuid::new_v4(),
        });
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();
        bus.publish(TournamentEvent::TournamentCreated { tournament_id: id });
        assert_eq!(rx.try_recv().unwrap().tournament_id(), id);
    }
}
