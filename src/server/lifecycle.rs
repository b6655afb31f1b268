use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

const MAX_EVENTS: usize = 1000;

/// Identifier of one configured supervisor session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supervisor lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A launch spec was resolved
    Configured,
    /// A stale pid file was cleaned up before starting
    StaleRecovered,
    /// Jetty was spawned and its pid persisted
    Started,
    /// Jetty opened its port within the startup wait
    Ready,
    /// Jetty did not open its port within the startup wait
    ReadinessTimedOut,
    /// Jetty was terminated and the pid file removed
    Stopped,
}

/// One recorded lifecycle event
#[derive(Debug, Clone)]
pub struct LifecycleRecord {
    /// Session the event belongs to
    pub session: SessionId,
    /// Event type
    pub event: LifecycleEvent,
    /// Event timestamp
    pub timestamp: Instant,
    /// Event details
    pub details: Option<String>,
}

/// Bounded in-memory history of lifecycle events
#[derive(Debug, Default)]
pub struct LifecycleLog {
    events: VecDeque<LifecycleRecord>,
}

impl LifecycleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, evicting the oldest once the history is full
    pub fn record(&mut self, session: SessionId, event: LifecycleEvent, details: Option<String>) {
        if self.events.len() == MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(LifecycleRecord {
            session,
            event,
            timestamp: Instant::now(),
            details,
        });
    }

    /// Recent events for a session, newest first
    pub fn session_events(&self, session: SessionId, limit: Option<usize>) -> Vec<LifecycleRecord> {
        self.newest_first()
            .filter(|record| record.session == session)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// All events, newest first
    pub fn all_events(&self, limit: Option<usize>) -> Vec<LifecycleRecord> {
        self.newest_first()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// The most recent event for a session
    pub fn last_event(&self, session: SessionId) -> Option<LifecycleEvent> {
        self.newest_first()
            .find(|record| record.session == session)
            .map(|record| record.event)
    }

    // Insertion order is chronological.
    fn newest_first(&self) -> impl Iterator<Item = &LifecycleRecord> {
        self.events.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_newest_first() {
        let mut log = LifecycleLog::new();
        let session = SessionId::new();
        let other = SessionId::new();

        log.record(session, LifecycleEvent::Configured, None);
        log.record(other, LifecycleEvent::Configured, None);
        log.record(session, LifecycleEvent::Started, Some("pid 42".to_string()));

        let events = log.session_events(session, None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, LifecycleEvent::Started);
        assert_eq!(events[1].event, LifecycleEvent::Configured);
        assert_eq!(log.last_event(other), Some(LifecycleEvent::Configured));
        assert_eq!(log.all_events(Some(1)).len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut log = LifecycleLog::new();
        let session = SessionId::new();
        for _ in 0..MAX_EVENTS + 5 {
            log.record(session, LifecycleEvent::Ready, None);
        }
        assert_eq!(log.all_events(None).len(), MAX_EVENTS);
    }
}
