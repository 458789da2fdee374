//! State management module for Tactix match sessions.
//!
//! This module provides the core state types and the transition engine:
//!
//! - `session` - Session snapshots (board, roster, turn state) and the store
//! - `patch` - Structured partial updates producing fresh snapshots
//! - `participant` - Live participant → connection/session index
//! - `reconnect` - Grace-period timers for disconnected participants
//! - `engine` - The transition engine tying it all together
//! - `envelope` - `{ok, data|error}` acknowledgement envelopes
//! - `id` - Opaque identifier generation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          MatchEngine                             │
//! │                                                                  │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  SessionStore  │  │ ParticipantIndex │  │ ReconnectSuper-  │  │
//! │  │                │  │                  │  │ visor            │  │
//! │  │ session_id →   │  │ player_id →      │  │ (session_id,     │  │
//! │  │   Session      │  │   connection_id  │  │  player_id) →    │  │
//! │  │                │  │   session_id     │  │   deadline       │  │
//! │  └────────────────┘  └──────────────────┘  └──────────────────┘  │
//! │                                                                  │
//! │  action ──▶ validate ──▶ SessionPatch ──▶ commit ──▶ Directives  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions never mutate a snapshot in place: each one derives a fresh
//! [`Session`] through a [`SessionPatch`] and commits it to the store. The
//! engine answers every action with [`Directive`]s for the transport layer
//! (channel membership and broadcasts) and never does I/O itself.

pub mod engine;
pub mod envelope;
pub mod id;
pub mod participant;
pub mod patch;
pub mod reconnect;
pub mod session;

// Re-export commonly used types
pub use engine::{
    Directive, EngineError, Event, MatchEngine, MoveUpdate, Seat, DEFAULT_GRACE_SECS,
};
pub use id::{generate_id, is_valid_id, ID_LEN};
pub use participant::{IndexEntry, ParticipantIndex};
pub use patch::{Field, PlayerPatch, PlayerSlot, SessionPatch};
pub use reconnect::ReconnectSupervisor;
pub use session::{
    Cell, Player, PlayerId, PlaysHistory, Session, SessionId, SessionStore, BOARD_CELLS,
    FIRST_MARKER, MAX_SESSION_PLAYERS, SECOND_MARKER,
};
