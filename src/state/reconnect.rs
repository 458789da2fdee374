//! Reconnection supervisor.
//!
//! Tracks one grace deadline per disconnected participant. The hosting
//! process drives firing by polling [`ReconnectSupervisor::due`] on its
//! tick; the engine re-validates every fired timer against the current
//! snapshot before evicting, so a timer that outlives a successful
//! reconnection is a safe no-op. Cancelling on reconnection is still done
//! explicitly to keep dead timers from accumulating.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::session::{PlayerId, SessionId};

/// One-shot grace timers keyed by (session, participant).
#[derive(Debug, Default)]
pub struct ReconnectSupervisor {
    deadlines: HashMap<(SessionId, PlayerId), DateTime<Utc>>,
}

impl ReconnectSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for a participant.
    pub fn schedule(&mut self, session_id: &str, player_id: &str, deadline: DateTime<Utc>) {
        self.deadlines
            .insert((session_id.to_string(), player_id.to_string()), deadline);
    }

    /// Disarm a participant's timer. Returns whether one was armed.
    pub fn cancel(&mut self, session_id: &str, player_id: &str) -> bool {
        self.deadlines
            .remove(&(session_id.to_string(), player_id.to_string()))
            .is_some()
    }

    /// Disarm every timer for a session. Returns how many were armed.
    pub fn cancel_session(&mut self, session_id: &str) -> usize {
        let before = self.deadlines.len();
        self.deadlines.retain(|(sid, _), _| sid != session_id);
        before - self.deadlines.len()
    }

    /// Drain the timers whose deadline has passed.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<(SessionId, PlayerId)> {
        let fired: Vec<(SessionId, PlayerId)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &fired {
            self.deadlines.remove(key);
        }

        fired
    }

    /// Peek at a participant's armed deadline.
    pub fn deadline(&self, session_id: &str, player_id: &str) -> Option<DateTime<Utc>> {
        self.deadlines
            .get(&(session_id.to_string(), player_id.to_string()))
            .copied()
    }

    /// Count armed timers.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_schedule_and_cancel() {
        let mut supervisor = ReconnectSupervisor::new();
        let deadline = Utc::now() + Duration::seconds(60);

        supervisor.schedule("ABC123", "P1", deadline);
        assert_eq!(supervisor.len(), 1);
        assert_eq!(supervisor.deadline("ABC123", "P1"), Some(deadline));

        assert!(supervisor.cancel("ABC123", "P1"));
        assert!(!supervisor.cancel("ABC123", "P1"));
        assert!(supervisor.is_empty());
    }

    #[test]
    fn test_due_drains_only_expired() {
        let mut supervisor = ReconnectSupervisor::new();
        let now = Utc::now();

        supervisor.schedule("ABC123", "P1", now - Duration::seconds(1));
        supervisor.schedule("ABC123", "P2", now + Duration::seconds(60));

        let fired = supervisor.due(now);
        assert_eq!(fired, vec![("ABC123".to_string(), "P1".to_string())]);

        // One-shot: the fired timer is gone, the future one remains
        assert_eq!(supervisor.len(), 1);
        assert!(supervisor.due(now).is_empty());
    }

    #[test]
    fn test_reschedule_overwrites() {
        let mut supervisor = ReconnectSupervisor::new();
        let now = Utc::now();

        supervisor.schedule("ABC123", "P1", now - Duration::seconds(1));
        supervisor.schedule("ABC123", "P1", now + Duration::seconds(60));

        assert!(supervisor.due(now).is_empty());
        assert_eq!(supervisor.len(), 1);
    }

    #[test]
    fn test_cancel_session() {
        let mut supervisor = ReconnectSupervisor::new();
        let deadline = Utc::now() + Duration::seconds(60);

        supervisor.schedule("ABC123", "P1", deadline);
        supervisor.schedule("ABC123", "P2", deadline);
        supervisor.schedule("DEF456", "P3", deadline);

        assert_eq!(supervisor.cancel_session("ABC123"), 2);
        assert_eq!(supervisor.len(), 1);
        assert!(supervisor.deadline("DEF456", "P3").is_some());
    }
}
