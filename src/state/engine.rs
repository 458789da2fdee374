//! Match-session state machine.
//!
//! Every inbound participant action is validated against the current
//! session snapshot, expressed as a [`SessionPatch`], committed atomically
//! to the store, and answered with [`Directive`]s for the transport layer
//! to execute (channel membership changes and broadcasts). The engine
//! never talks to the network itself.
//!
//! Actions with an ack channel (`create`, `join`, `enter_lobby`) report
//! failures as [`EngineError`]; the remaining actions silently no-op when
//! the session or seat has vanished - a mid-match client is trusted to
//! have validated its own membership, and a vanished session means there
//! is nothing left to do.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use super::id::generate_id;
use super::participant::ParticipantIndex;
use super::patch::{Field, PlayerPatch, PlayerSlot, SessionPatch};
use super::reconnect::ReconnectSupervisor;
use super::session::{
    Cell, Player, PlayerId, PlaysHistory, Session, SessionId, SessionStore, BOARD_CELLS,
    FIRST_MARKER, SECOND_MARKER,
};

/// Default reconnection grace period in seconds.
pub const DEFAULT_GRACE_SECS: i64 = 60;

/// Errors reported on the acknowledgement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// Session absent.
    NotFound,
    /// Session already has two seated players.
    Full,
    /// Participant not seated in the referenced session.
    Forbidden,
    /// Grace period elapsed before the participant returned.
    ReconnectWindowExpired,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Session not found"),
            Self::Full => write!(f, "Session is full"),
            Self::Forbidden => write!(f, "Not a participant in this session"),
            Self::ReconnectWindowExpired => write!(f, "Reconnection window expired"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Events broadcast to a session's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Generic state update carrying the full snapshot.
    Update(Value),

    /// A match concluded; carries the winner and the final snapshot.
    MatchConcluded { winner_id: PlayerId, snapshot: Value },

    /// The board was reset for a rematch round.
    SessionReset(Value),

    /// The session was evicted. No payload.
    SessionEnded,
}

/// Instructions for the transport layer, returned by every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Subscribe a connection to a session's channel.
    JoinChannel {
        session_id: SessionId,
        connection_id: String,
    },

    /// Unsubscribe a connection from a session's channel.
    LeaveChannel {
        session_id: SessionId,
        connection_id: String,
    },

    /// Fire-and-forget event to everyone on the channel.
    Broadcast { session_id: SessionId, event: Event },
}

/// Seat handed back to the caller on `create`/`join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub session_id: SessionId,
    pub player_id: PlayerId,
}

impl Seat {
    /// Ack payload for the response envelope.
    pub fn to_json(&self) -> Value {
        json!({ "session_id": self.session_id, "player_id": self.player_id })
    }
}

/// Caller-reported move payload.
///
/// Committed without legality checks: valid cell and turn-order
/// enforcement is a trusted-client boundary, the core only upholds
/// session-level invariants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveUpdate {
    pub cells: Vec<Cell>,
    pub plays_history: PlaysHistory,
    pub current_player: Option<PlayerId>,
}

/// The behavioral core: owns the session store, participant index and
/// grace timers, and applies every transition through the patch engine.
#[derive(Debug)]
pub struct MatchEngine {
    store: SessionStore,
    index: ParticipantIndex,
    supervisor: ReconnectSupervisor,
    grace_period: Duration,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine {
    pub fn new() -> Self {
        Self {
            store: SessionStore::new(),
            index: ParticipantIndex::new(),
            supervisor: ReconnectSupervisor::new(),
            grace_period: Duration::seconds(DEFAULT_GRACE_SECS),
        }
    }

    /// Engine with a custom grace period (used by hosts with different
    /// tolerance, and by tests that exercise expiry without sleeping).
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            grace_period,
            ..Self::new()
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn index(&self) -> &ParticipantIndex {
        &self.index
    }

    pub fn supervisor(&self) -> &ReconnectSupervisor {
        &self.supervisor
    }

    /// Create a session and seat the creator as marker 0.
    ///
    /// Always succeeds; the seat is acknowledged directly to the caller,
    /// nothing is broadcast.
    pub fn create(&mut self, player_name: &str, connection_id: &str) -> (Seat, Vec<Directive>) {
        let session_id = generate_id();
        let player_id = generate_id();

        let base = Session::new(session_id.clone());
        let next = SessionPatch {
            current_player: Field::set(Some(player_id.clone())),
            ..Default::default()
        }
        .player(
            player_id.as_str(),
            PlayerSlot::Insert(Player::new(player_name, FIRST_MARKER)),
        )
        .apply(&base);
        self.store.set(next);
        self.index.register(&player_id, connection_id, &session_id);

        tracing::info!(
            session = session_id.as_str(),
            player = player_id.as_str(),
            "Session created"
        );

        let directives = vec![Directive::JoinChannel {
            session_id: session_id.clone(),
            connection_id: connection_id.to_string(),
        }];
        (
            Seat {
                session_id,
                player_id,
            },
            directives,
        )
    }

    /// Seat a second participant as marker 1.
    ///
    /// A supplied participant id is reused (reconnection-by-join).
    pub fn join(
        &mut self,
        session_id: &str,
        player_name: &str,
        connection_id: &str,
        existing_player_id: Option<&str>,
    ) -> Result<(Seat, Vec<Directive>), EngineError> {
        let session = self
            .store
            .get(session_id)
            .cloned()
            .ok_or(EngineError::NotFound)?;
        if session.is_full() {
            return Err(EngineError::Full);
        }

        let player_id = existing_player_id
            .map(str::to_string)
            .unwrap_or_else(generate_id);

        let next = SessionPatch::default()
            .player(
                player_id.as_str(),
                PlayerSlot::Insert(Player::new(player_name, SECOND_MARKER)),
            )
            .apply(&session);
        self.store.set(next);
        self.index.register(&player_id, connection_id, session_id);

        tracing::info!(
            session = session_id,
            player = player_id.as_str(),
            "Participant joined"
        );

        let directives = vec![Directive::JoinChannel {
            session_id: session_id.to_string(),
            connection_id: connection_id.to_string(),
        }];
        Ok((
            Seat {
                session_id: session_id.to_string(),
                player_id,
            },
            directives,
        ))
    }

    /// Admit a seated participant to the session channel and send the full
    /// snapshot. Clears reconnection state when the participant returns
    /// within the grace window; past the window the seat is vacated.
    pub fn enter_lobby(
        &mut self,
        session_id: &str,
        player_id: &str,
        connection_id: &str,
    ) -> Result<Vec<Directive>, EngineError> {
        let session = self
            .store
            .get(session_id)
            .cloned()
            .ok_or(EngineError::NotFound)?;
        let player = session
            .get_player(player_id)
            .ok_or(EngineError::Forbidden)?;

        let current = if player.disconnected {
            let expired = player
                .reconnect_deadline
                .is_some_and(|deadline| Utc::now() >= deadline);
            if expired {
                let next = SessionPatch::default()
                    .player(player_id, PlayerSlot::Remove)
                    .apply(&session);
                self.store.set(next);
                self.supervisor.cancel(session_id, player_id);
                self.index.remove(player_id);
                tracing::info!(
                    session = session_id,
                    player = player_id,
                    "Reconnection window expired; seat vacated"
                );
                return Err(EngineError::ReconnectWindowExpired);
            }

            let next = SessionPatch::default()
                .player(
                    player_id,
                    PlayerSlot::Update(PlayerPatch {
                        disconnected: Field::set(false),
                        reconnect_deadline: Field::set(None),
                        ..Default::default()
                    }),
                )
                .apply(&session);
            self.store.set(next.clone());
            self.supervisor.cancel(session_id, player_id);
            tracing::info!(
                session = session_id,
                player = player_id,
                "Participant reconnected within grace window"
            );
            next
        } else {
            session
        };

        self.index.register(player_id, connection_id, session_id);

        Ok(vec![
            Directive::JoinChannel {
                session_id: session_id.to_string(),
                connection_id: connection_id.to_string(),
            },
            Directive::Broadcast {
                session_id: session_id.to_string(),
                event: Event::Update(current.to_json()),
            },
        ])
    }

    /// Flip a participant's ready flag. Disconnected players cannot be
    /// marked ready; the reconnection flow re-admits them first.
    pub fn toggle_ready(&mut self, session_id: &str, player_id: &str) -> Vec<Directive> {
        let Some(session) = self.store.get(session_id).cloned() else {
            tracing::debug!(session = session_id, "Ready toggle for missing session");
            return Vec::new();
        };
        match session.get_player(player_id) {
            Some(player) if !player.disconnected => {}
            _ => {
                tracing::debug!(
                    session = session_id,
                    player = player_id,
                    "Ready toggle ignored"
                );
                return Vec::new();
            }
        }

        let next = SessionPatch::default()
            .player(
                player_id,
                PlayerSlot::Update(PlayerPatch {
                    is_ready: Field::map(|ready: &bool| !ready),
                    ..Default::default()
                }),
            )
            .apply(&session);
        let snapshot = next.to_json();
        self.store.set(next);

        vec![Directive::Broadcast {
            session_id: session_id.to_string(),
            event: Event::Update(snapshot),
        }]
    }

    /// Commit a caller-reported move as the authoritative board state.
    pub fn play(&mut self, session_id: &str, update: MoveUpdate) -> Vec<Directive> {
        let Some(session) = self.store.get(session_id).cloned() else {
            tracing::debug!(session = session_id, "Move for missing session");
            return Vec::new();
        };

        let next = SessionPatch {
            cells: Some(update.cells),
            plays_history: Some(update.plays_history),
            current_player: Field::set(update.current_player),
            ..Default::default()
        }
        .apply(&session);
        let snapshot = next.to_json();
        self.store.set(next);

        vec![Directive::Broadcast {
            session_id: session_id.to_string(),
            event: Event::Update(snapshot),
        }]
    }

    /// Conclude a match: commit the final board, credit the winner, clear
    /// both ready flags and record the winner for the next round's opening
    /// turn.
    pub fn win(&mut self, session_id: &str, update: MoveUpdate, winner_id: &str) -> Vec<Directive> {
        let Some(session) = self.store.get(session_id).cloned() else {
            tracing::debug!(session = session_id, "Win report for missing session");
            return Vec::new();
        };
        if !session.has_player(winner_id) {
            tracing::debug!(
                session = session_id,
                winner = winner_id,
                "Win report for unseated participant"
            );
            return Vec::new();
        }

        let mut patch = SessionPatch {
            cells: Some(update.cells),
            plays_history: Some(update.plays_history),
            current_player: Field::set(update.current_player),
            last_winner_id: Field::set(Some(winner_id.to_string())),
            ..Default::default()
        }
        .player(
            winner_id,
            PlayerSlot::Update(PlayerPatch {
                wins: Field::map(|wins| wins + 1),
                is_ready: Field::set(false),
                ..Default::default()
            }),
        );
        if let Some(opponent_id) = session.opponent_of(winner_id) {
            patch = patch.player(
                opponent_id,
                PlayerSlot::Update(PlayerPatch {
                    is_ready: Field::set(false),
                    ..Default::default()
                }),
            );
        }

        let next = patch.apply(&session);
        let snapshot = next.to_json();
        self.store.set(next);

        tracing::info!(
            session = session_id,
            winner = winner_id,
            "Match concluded"
        );

        vec![Directive::Broadcast {
            session_id: session_id.to_string(),
            event: Event::MatchConcluded {
                winner_id: winner_id.to_string(),
                snapshot,
            },
        }]
    }

    /// Record a rematch vote.
    ///
    /// A decline ends the session immediately. The first accept flags the
    /// voter; the accept that completes the pair resets the board, with the
    /// prior winner's marker opening (marker 0 when the round had no
    /// winner).
    pub fn rematch_vote(
        &mut self,
        session_id: &str,
        player_id: &str,
        wants_rematch: bool,
    ) -> Vec<Directive> {
        let Some(session) = self.store.get(session_id).cloned() else {
            tracing::debug!(session = session_id, "Rematch vote for missing session");
            return Vec::new();
        };
        if !session.has_player(player_id) {
            tracing::debug!(
                session = session_id,
                player = player_id,
                "Rematch vote from unseated participant"
            );
            return Vec::new();
        }

        if !wants_rematch {
            let voter_connection = self.index.get(player_id).map(|e| e.connection_id.clone());
            self.index.remove(player_id);
            self.evict(session_id);
            tracing::info!(
                session = session_id,
                player = player_id,
                "Rematch declined; session ended"
            );

            let mut directives = Vec::new();
            if let Some(connection_id) = voter_connection {
                directives.push(Directive::LeaveChannel {
                    session_id: session_id.to_string(),
                    connection_id,
                });
            }
            directives.push(Directive::Broadcast {
                session_id: session_id.to_string(),
                event: Event::SessionEnded,
            });
            return directives;
        }

        let opponent_ready = session
            .opponent_of(player_id)
            .and_then(|id| session.players.get(&id))
            .is_some_and(|p| p.is_ready);

        if opponent_ready {
            let opening_player = session
                .last_winner_id
                .clone()
                .or_else(|| session.id_with_marker(FIRST_MARKER));

            let mut patch = SessionPatch {
                cells: Some(vec![Cell::default(); BOARD_CELLS]),
                plays_history: Some(PlaysHistory::default()),
                current_player: Field::set(opening_player),
                ..Default::default()
            };
            for id in session.player_ids() {
                patch = patch.player(
                    id,
                    PlayerSlot::Update(PlayerPatch {
                        is_ready: Field::set(false),
                        ..Default::default()
                    }),
                );
            }

            let next = patch.apply(&session);
            let snapshot = next.to_json();
            self.store.set(next);
            tracing::info!(session = session_id, "Rematch accepted; board reset");

            return vec![Directive::Broadcast {
                session_id: session_id.to_string(),
                event: Event::SessionReset(snapshot),
            }];
        }

        // First vote in: flag the voter so the opponent's UI shows the
        // pending rematch.
        let next = SessionPatch::default()
            .player(
                player_id,
                PlayerSlot::Update(PlayerPatch {
                    is_ready: Field::set(true),
                    ..Default::default()
                }),
            )
            .apply(&session);
        let snapshot = next.to_json();
        self.store.set(next);

        vec![Directive::Broadcast {
            session_id: session_id.to_string(),
            event: Event::Update(snapshot),
        }]
    }

    /// Detach a participant from its channel and drop its index entry.
    /// Session player data is untouched; full cleanup pairs with the
    /// disconnect path.
    pub fn leave_room(&mut self, session_id: &str, player_id: &str) -> Vec<Directive> {
        match self.index.remove(player_id) {
            Some(entry) => vec![Directive::LeaveChannel {
                session_id: entry.session_id,
                connection_id: entry.connection_id,
            }],
            None => {
                tracing::debug!(
                    session = session_id,
                    player = player_id,
                    "Leave for untracked participant"
                );
                Vec::new()
            }
        }
    }

    /// Handle an abrupt transport disconnect, known only by connection id.
    ///
    /// With a peer still seated the participant keeps its seat behind a
    /// grace timer; alone, the session is evicted immediately. When the
    /// last tracked participant in the whole process drops, every session
    /// is cleared (safety net against leaked sessions).
    pub fn disconnect(&mut self, connection_id: &str) -> Vec<Directive> {
        let Some((player_id, entry)) = self.index.resolve_connection(connection_id) else {
            tracing::debug!(connection = connection_id, "Disconnect from unknown connection");
            return Vec::new();
        };

        let mut directives = Vec::new();

        if let Some(session) = self.store.get(&entry.session_id).cloned() {
            let seated_here = session.has_player(&player_id);
            let peers = session.players.len() - usize::from(seated_here);

            if peers == 0 {
                tracing::info!(
                    session = entry.session_id.as_str(),
                    player = player_id.as_str(),
                    "Last participant disconnected; evicting session"
                );
                self.evict(&entry.session_id);
            } else if seated_here {
                let deadline = Utc::now() + self.grace_period;
                let next = SessionPatch::default()
                    .player(
                        player_id.as_str(),
                        PlayerSlot::Update(PlayerPatch {
                            disconnected: Field::set(true),
                            is_ready: Field::set(false),
                            reconnect_deadline: Field::set(Some(deadline)),
                            ..Default::default()
                        }),
                    )
                    .apply(&session);
                let snapshot = next.to_json();
                self.store.set(next);
                self.supervisor
                    .schedule(&entry.session_id, &player_id, deadline);
                directives.push(Directive::Broadcast {
                    session_id: entry.session_id.clone(),
                    event: Event::Update(snapshot),
                });
                tracing::info!(
                    session = entry.session_id.as_str(),
                    player = player_id.as_str(),
                    "Participant disconnected; grace timer armed"
                );
            }
        }

        self.index.remove(&player_id);

        if self.index.is_empty() {
            if !self.store.is_empty() {
                tracing::warn!(
                    sessions = self.store.len(),
                    "No active participants left; clearing all sessions"
                );
            }
            self.store.clear();
            self.supervisor.clear();
        }

        directives
    }

    /// Drive the grace timers.
    ///
    /// Each fired timer is re-validated against the current snapshot, never
    /// the one captured when the timer was armed: a participant who
    /// reconnected in the interim makes the firing a no-op.
    pub fn fire_due_reconnects(&mut self, now: DateTime<Utc>) -> Vec<Directive> {
        let mut directives = Vec::new();

        for (session_id, player_id) in self.supervisor.due(now) {
            let still_disconnected = self
                .store
                .get(&session_id)
                .and_then(|s| s.get_player(&player_id))
                .is_some_and(|p| p.disconnected);
            if !still_disconnected {
                tracing::debug!(
                    session = session_id.as_str(),
                    player = player_id.as_str(),
                    "Grace timer fired after reconnection; ignoring"
                );
                continue;
            }

            directives.push(Directive::Broadcast {
                session_id: session_id.clone(),
                event: Event::SessionEnded,
            });
            tracing::info!(
                session = session_id.as_str(),
                player = player_id.as_str(),
                "Grace window elapsed; evicting session"
            );
            self.evict(&session_id);
        }

        directives
    }

    /// Drop a session and every trace of its participants.
    fn evict(&mut self, session_id: &str) {
        self.store.delete(session_id);
        let affected = self.index.remove_session(session_id);
        let timers = self.supervisor.cancel_session(session_id);
        tracing::info!(
            session = session_id,
            participants = affected.len(),
            timers,
            "Session evicted"
        );
    }
}
