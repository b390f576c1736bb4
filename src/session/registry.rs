//! Sessions indexed by id, for fan-out.

use bytes::Bytes;
use dashmap::DashMap;

use super::Session;

/// Concurrent map of live sessions.
///
/// The registry holds strong handles; remove a session from its closed
/// handler to release it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<u64, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self { Self::default() }

    /// Returns the session previously stored under the same id.
    pub fn insert(&self, session: Session) -> Option<Session> {
        self.sessions.insert(session.id(), session)
    }

    pub fn remove(&self, id: u64) -> Option<Session> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    pub fn get(&self, id: u64) -> Option<Session> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn len(&self) -> usize { self.sessions.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.sessions.is_empty() }

    /// Queue one shared payload on every open session,
    /// returns how many sessions it was queued on.
    pub fn broadcast(&self, msg: Bytes) -> usize {
        // collect first, so no shard lock is held while sending
        let targets: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| entry.value().clone())
            .collect();

        for session in targets.iter() {
            session.send(msg.clone());
        }

        targets.len()
    }
}
