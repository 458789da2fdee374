//! Tactix State Library
//!
//! This crate provides match-session state management for Tactix game logic.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Match Engine** - The session lifecycle (create, join, ready, play,
//!   win, rematch, leave, disconnect) as validated transitions that answer
//!   with transport directives.
//!
//! - **Patch Engine** - Structured partial updates over immutable session
//!   snapshots, with per-field keep/set/map semantics.
//!
//! - **Participant Index** - Look up a participant's connection and session,
//!   or resolve an abrupt disconnect back to its seat.
//!
//! - **Reconnection Supervisor** - Grace-period deadlines for disconnected
//!   participants, driven by the host's tick.
//!
//! # Design Principles
//!
//! 1. **Snapshots are immutable** - Transitions derive a fresh snapshot
//!    through a patch and commit it; the prior one stays intact.
//!
//! 2. **The engine decides, the host executes** - Every transition returns
//!    directives (join/leave channel, broadcast event); no I/O happens here.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!
//! 4. **Serialization-ready** - All snapshots convert to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use tactix_state::state::{Directive, MatchEngine};
//!
//! let mut engine = MatchEngine::new();
//!
//! // Alice opens a session, Bob joins with the shared id
//! let (host, _) = engine.create("Alice", "conn-1");
//! let (guest, _) = engine.join(&host.session_id, "Bob", "conn-2", None).unwrap();
//!
//! // Both enter the lobby; the engine tells the transport what to do
//! let directives = engine
//!     .enter_lobby(&host.session_id, &guest.player_id, "conn-2")
//!     .unwrap();
//! assert!(matches!(directives[0], Directive::JoinChannel { .. }));
//!
//! engine.toggle_ready(&host.session_id, &host.player_id);
//! engine.toggle_ready(&host.session_id, &guest.player_id);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
