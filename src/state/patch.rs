//! Structured partial updates over session snapshots.
//!
//! Transitions never mutate a stored session in place. They describe a
//! delta as a [`SessionPatch`] and apply it to the current snapshot,
//! producing a fresh one while leaving the original intact for diffing and
//! opponent lookups. Each field carries a tagged update description instead
//! of an untyped merge, so the shape of a patch is checked at compile time.
//!
//! Sequences (`cells`, `plays_history`) are atomic units: a patch replaces
//! them wholesale, never element-wise.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::session::{Cell, Player, PlayerId, PlaysHistory, Session};

/// Update description for a single field.
pub enum Field<T> {
    /// Leave the field untouched.
    Keep,

    /// Store a literal value.
    Set(T),

    /// Derive the new value from the previous one. Enables atomic
    /// increment/toggle semantics without a read-modify-write race in the
    /// caller.
    Map(Box<dyn Fn(&T) -> T>),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T: Clone> Field<T> {
    pub fn set(value: T) -> Self {
        Self::Set(value)
    }

    pub fn map(f: impl Fn(&T) -> T + 'static) -> Self {
        Self::Map(Box::new(f))
    }

    /// Resolve against the current value.
    pub fn resolve(&self, current: &T) -> T {
        match self {
            Self::Keep => current.clone(),
            Self::Set(value) => value.clone(),
            Self::Map(f) => f(current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "Keep"),
            Self::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Self::Map(_) => write!(f, "Map(..)"),
        }
    }
}

/// Nested patch over a single seated player.
#[derive(Debug, Default)]
pub struct PlayerPatch {
    pub marker: Field<u8>,
    pub name: Field<String>,
    pub wins: Field<u32>,
    pub is_ready: Field<bool>,
    pub disconnected: Field<bool>,
    pub reconnect_deadline: Field<Option<DateTime<Utc>>>,
}

impl PlayerPatch {
    /// Apply to a player, producing a new one.
    pub fn apply(&self, player: &Player) -> Player {
        Player {
            marker: self.marker.resolve(&player.marker),
            name: self.name.resolve(&player.name),
            wins: self.wins.resolve(&player.wins),
            is_ready: self.is_ready.resolve(&player.is_ready),
            disconnected: self.disconnected.resolve(&player.disconnected),
            reconnect_deadline: self.reconnect_deadline.resolve(&player.reconnect_deadline),
        }
    }
}

/// Update description for one player slot in the roster.
#[derive(Debug)]
pub enum PlayerSlot {
    /// Seat a player wholesale.
    Insert(Player),

    /// Merge a nested patch into the existing player. A vacant slot is
    /// left vacant.
    Update(PlayerPatch),

    /// Vacate the seat.
    Remove,
}

/// Partial update over a session snapshot.
#[derive(Debug, Default)]
pub struct SessionPatch {
    /// Per-slot roster updates, merged by participant id.
    pub players: BTreeMap<PlayerId, PlayerSlot>,

    /// Wholesale board replacement.
    pub cells: Option<Vec<Cell>>,

    /// Wholesale history replacement.
    pub plays_history: Option<PlaysHistory>,

    pub current_player: Field<Option<PlayerId>>,
    pub last_winner_id: Field<Option<PlayerId>>,
}

impl SessionPatch {
    /// Builder: add a roster update for one slot.
    pub fn player(mut self, id: impl Into<PlayerId>, slot: PlayerSlot) -> Self {
        self.players.insert(id.into(), slot);
        self
    }

    /// Apply to a snapshot, producing a new one.
    ///
    /// The input is never mutated; every untouched field is cloned from it,
    /// so callers may keep the prior snapshot around after the call.
    pub fn apply(&self, session: &Session) -> Session {
        let mut players = session.players.clone();
        for (id, slot) in &self.players {
            match slot {
                PlayerSlot::Insert(player) => {
                    players.insert(id.clone(), player.clone());
                }
                PlayerSlot::Update(patch) => {
                    if let Some(current) = session.players.get(id) {
                        players.insert(id.clone(), patch.apply(current));
                    }
                }
                PlayerSlot::Remove => {
                    players.remove(id);
                }
            }
        }

        Session {
            id: session.id.clone(),
            players,
            cells: self
                .cells
                .clone()
                .unwrap_or_else(|| session.cells.clone()),
            plays_history: self
                .plays_history
                .clone()
                .unwrap_or_else(|| session.plays_history.clone()),
            current_player: self.current_player.resolve(&session.current_player),
            last_winner_id: self.last_winner_id.resolve(&session.last_winner_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::{FIRST_MARKER, SECOND_MARKER};

    fn make_session() -> Session {
        let mut session = Session::new("ABC123".to_string());
        session
            .players
            .insert("P1".to_string(), Player::new("Alice", FIRST_MARKER));
        session
            .players
            .insert("P2".to_string(), Player::new("Bob", SECOND_MARKER));
        session
    }

    #[test]
    fn test_apply_never_mutates_input() {
        let original = make_session();
        let before = original.clone();

        let patch = SessionPatch {
            current_player: Field::set(Some("P2".to_string())),
            last_winner_id: Field::set(Some("P1".to_string())),
            ..Default::default()
        }
        .player(
            "P1",
            PlayerSlot::Update(PlayerPatch {
                wins: Field::map(|w| w + 1),
                ..Default::default()
            }),
        );

        let next = patch.apply(&original);

        // Derived snapshot reflects the delta
        assert_eq!(next.players["P1"].wins, 1);
        assert_eq!(next.current_player, Some("P2".to_string()));

        // Original is byte-for-byte what it was before the call
        assert_eq!(original, before);
        assert_eq!(original.players["P1"].wins, 0);
        assert_eq!(original.current_player, None);
    }

    #[test]
    fn test_map_toggles_in_place() {
        let session = make_session();
        let toggle = || {
            SessionPatch::default().player(
                "P1",
                PlayerSlot::Update(PlayerPatch {
                    is_ready: Field::map(|r: &bool| !r),
                    ..Default::default()
                }),
            )
        };

        let once = toggle().apply(&session);
        assert!(once.players["P1"].is_ready);

        let twice = toggle().apply(&once);
        assert!(!twice.players["P1"].is_ready);
    }

    #[test]
    fn test_insert_and_remove_slots() {
        let empty = Session::new("ABC123".to_string());

        let seated = SessionPatch::default()
            .player("P1", PlayerSlot::Insert(Player::new("Alice", FIRST_MARKER)))
            .apply(&empty);
        assert!(seated.has_player("P1"));
        assert!(empty.players.is_empty());

        let vacated = SessionPatch::default()
            .player("P1", PlayerSlot::Remove)
            .apply(&seated);
        assert!(!vacated.has_player("P1"));
        assert!(seated.has_player("P1"));
    }

    #[test]
    fn test_update_on_vacant_slot_is_noop() {
        let session = make_session();
        let next = SessionPatch::default()
            .player(
                "GHOST",
                PlayerSlot::Update(PlayerPatch {
                    wins: Field::set(99),
                    ..Default::default()
                }),
            )
            .apply(&session);

        assert_eq!(next, session);
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let mut session = make_session();
        session.cells[0].active = true;
        session.cells[0].last_touched = Some("P1".to_string());
        session.plays_history = [vec![0], vec![]];

        let fresh = vec![Cell::default(); session.cells.len()];
        let next = SessionPatch {
            cells: Some(fresh),
            plays_history: Some(PlaysHistory::default()),
            ..Default::default()
        }
        .apply(&session);

        assert!(next.cells.iter().all(|c| !c.active && c.last_touched.is_none()));
        assert_eq!(next.plays_history, PlaysHistory::default());

        // Untouched sibling fields survive the replacement
        assert_eq!(next.players, session.players);
        assert!(session.cells[0].active);
    }

    #[test]
    fn test_untouched_fields_are_carried_over() {
        let mut session = make_session();
        session.last_winner_id = Some("P2".to_string());
        session.current_player = Some("P1".to_string());

        let next = SessionPatch::default()
            .player(
                "P2",
                PlayerSlot::Update(PlayerPatch {
                    disconnected: Field::set(true),
                    ..Default::default()
                }),
            )
            .apply(&session);

        assert_eq!(next.last_winner_id, session.last_winner_id);
        assert_eq!(next.current_player, session.current_player);
        assert_eq!(next.cells, session.cells);
        assert_eq!(next.players["P1"], session.players["P1"]);
    }
}
