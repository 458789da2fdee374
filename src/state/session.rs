//! Session state and the session store.
//!
//! A session is one two-player match: board cells, player roster, turn
//! state, and rematch bookkeeping. The store is a pure keyed map with no
//! transition logic; transitions live in [`engine`](super::engine).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of board cells (3x3).
pub const BOARD_CELLS: usize = 9;

/// Maximum players per session.
pub const MAX_SESSION_PLAYERS: usize = 2;

/// Marker seated by `create`; moves first on a fresh board.
pub const FIRST_MARKER: u8 = 0;

/// Marker seated by `join`.
pub const SECOND_MARKER: u8 = 1;

/// Opaque session identifier.
pub type SessionId = String;

/// Opaque participant identifier, stable across reconnects.
pub type PlayerId = String;

/// A single board cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// Player who last claimed this cell, if any.
    pub last_touched: Option<PlayerId>,

    /// Whether the cell is claimed.
    pub active: bool,
}

/// Per-marker move-index history. Pass-through for client undo/replay;
/// the core persists it without interpretation.
pub type PlaysHistory = [Vec<usize>; 2];

/// A seated player within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Symbol/turn slot, unique within the session (0 or 1).
    pub marker: u8,

    /// Display name.
    pub name: String,

    /// Matches won across rematch rounds.
    pub wins: u32,

    /// Ready flag; doubles as the rematch vote between rounds.
    pub is_ready: bool,

    /// Whether the player's transport connection dropped.
    pub disconnected: bool,

    /// Absolute reconnection deadline, present only while disconnected.
    pub reconnect_deadline: Option<DateTime<Utc>>,
}

impl Player {
    pub fn new(name: impl Into<String>, marker: u8) -> Self {
        Self {
            marker,
            name: name.into(),
            wins: 0,
            is_ready: false,
            disconnected: false,
            reconnect_deadline: None,
        }
    }
}

/// One two-player match instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Unique session ID.
    pub id: SessionId,

    /// Seated players indexed by participant id.
    pub players: HashMap<PlayerId, Player>,

    /// The board; index = board position.
    pub cells: Vec<Cell>,

    /// Move history, one sequence per marker.
    pub plays_history: PlaysHistory,

    /// Participant whose turn it is, if the active marker is occupied.
    pub current_player: Option<PlayerId>,

    /// Winner of the most recent concluded match.
    pub last_winner_id: Option<PlayerId>,
}

impl Session {
    /// Create an empty session with a fresh board.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            players: HashMap::new(),
            cells: vec![Cell::default(); BOARD_CELLS],
            plays_history: PlaysHistory::default(),
            current_player: None,
            last_winner_id: None,
        }
    }

    /// Check if both seats are taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_SESSION_PLAYERS
    }

    /// Check if a participant is seated here.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Get a seated player.
    pub fn get_player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Get the other seated participant's id.
    pub fn opponent_of(&self, player_id: &str) -> Option<PlayerId> {
        self.players
            .keys()
            .find(|id| id.as_str() != player_id)
            .cloned()
    }

    /// Get the id of the participant holding a marker.
    pub fn id_with_marker(&self, marker: u8) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, p)| p.marker == marker)
            .map(|(id, _)| id.clone())
    }

    /// All seated participant ids.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().cloned().collect()
    }

    /// Convert the full session snapshot to JSON for clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.id,
            "players": self.players,
            "cells": self.cells,
            "plays_history": self.plays_history,
            "current_player": self.current_player,
            "last_winner_id": self.last_winner_id,
        })
    }
}

/// Session store - single source of truth for live sessions.
///
/// A pure keyed store: transitions read a snapshot, derive a new one
/// through the patch engine, and commit it back with [`SessionStore::set`].
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current snapshot for a session.
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Commit a snapshot, replacing any previous one for the same id.
    pub fn set(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Remove a session.
    pub fn delete(&mut self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    /// Drop every session.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Count live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All live session ids.
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }
}
