//! Participant index.
//!
//! Maps each live participant to its transport connection and session. An
//! abrupt disconnect only carries a connection id, so resolving it back to
//! a session goes through this index rather than the session store.

use std::collections::HashMap;

use super::session::{PlayerId, SessionId};

/// Where a participant currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Transport-level connection id.
    pub connection_id: String,

    /// Session the participant is seated in.
    pub session_id: SessionId,
}

/// Index of live participants.
///
/// An entry exists exactly while a participant has both a connection and a
/// seat; it is removed on leave, on session eviction, and by the global
/// safety sweep.
#[derive(Debug, Default)]
pub struct ParticipantIndex {
    entries: HashMap<PlayerId, IndexEntry>,
}

impl ParticipantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh a participant's entry.
    pub fn register(&mut self, player_id: &str, connection_id: &str, session_id: &str) {
        self.entries.insert(
            player_id.to_string(),
            IndexEntry {
                connection_id: connection_id.to_string(),
                session_id: session_id.to_string(),
            },
        );
    }

    /// Get a participant's entry.
    pub fn get(&self, player_id: &str) -> Option<&IndexEntry> {
        self.entries.get(player_id)
    }

    /// Remove a participant's entry.
    pub fn remove(&mut self, player_id: &str) -> Option<IndexEntry> {
        self.entries.remove(player_id)
    }

    /// Remove every entry for a session. Returns the affected participants.
    pub fn remove_session(&mut self, session_id: &str) -> Vec<PlayerId> {
        let affected: Vec<PlayerId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.session_id == session_id)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &affected {
            self.entries.remove(id);
        }

        affected
    }

    /// Resolve a transport connection back to its participant.
    ///
    /// Linear scan; fine at two participants per session, known O(n) hot
    /// path at larger scale.
    pub fn resolve_connection(&self, connection_id: &str) -> Option<(PlayerId, IndexEntry)> {
        self.entries
            .iter()
            .find(|(_, e)| e.connection_id == connection_id)
            .map(|(id, e)| (id.clone(), e.clone()))
    }

    /// Count live participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut index = ParticipantIndex::new();
        index.register("P1", "conn-1", "ABC123");

        let entry = index.get("P1").unwrap();
        assert_eq!(entry.connection_id, "conn-1");
        assert_eq!(entry.session_id, "ABC123");
        assert!(index.get("P2").is_none());
    }

    #[test]
    fn test_register_refreshes_connection() {
        let mut index = ParticipantIndex::new();
        index.register("P1", "conn-1", "ABC123");
        index.register("P1", "conn-2", "ABC123");

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("P1").unwrap().connection_id, "conn-2");
    }

    #[test]
    fn test_resolve_connection() {
        let mut index = ParticipantIndex::new();
        index.register("P1", "conn-1", "ABC123");
        index.register("P2", "conn-2", "ABC123");

        let (player_id, entry) = index.resolve_connection("conn-2").unwrap();
        assert_eq!(player_id, "P2");
        assert_eq!(entry.session_id, "ABC123");
        assert!(index.resolve_connection("conn-9").is_none());
    }

    #[test]
    fn test_remove_session() {
        let mut index = ParticipantIndex::new();
        index.register("P1", "conn-1", "ABC123");
        index.register("P2", "conn-2", "ABC123");
        index.register("P3", "conn-3", "DEF456");

        let mut affected = index.remove_session("ABC123");
        affected.sort();
        assert_eq!(affected, vec!["P1".to_string(), "P2".to_string()]);
        assert_eq!(index.len(), 1);
        assert!(index.get("P3").is_some());
    }

    #[test]
    fn test_clear() {
        let mut index = ParticipantIndex::new();
        index.register("P1", "conn-1", "ABC123");
        assert!(!index.is_empty());

        index.clear();
        assert!(index.is_empty());
    }
}
