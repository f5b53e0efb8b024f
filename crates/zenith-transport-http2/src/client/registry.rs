//! Shared registry of one `Http2Session` per peer, for callers spread
//! across worker lanes. Lookups take a shared read lock; only creating or
//! replacing a session takes the exclusive write lock, and the write path
//! re-checks under that lock in case another thread already won the race.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::RwLock;

use super::{ClientCallback, Http2Client, Http2Session, OutboundRequest, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};

pub struct Http2ClientRegistry {
    sessions: RwLock<HashMap<SocketAddr, Http2Session>>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Http2ClientRegistry {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            connect_timeout,
            request_timeout,
        }
    }

    /// Returns the live session for `peer`, creating one if absent or if
    /// the existing one has gone dead.
    pub fn get_or_create(&self, peer: SocketAddr) -> Http2Session {
        if let Some(session) = self.sessions.read().get(&peer) {
            if !session.is_dead() {
                return session.clone();
            }
        }
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get(&peer) {
            if !session.is_dead() {
                return session.clone();
            }
        }
        let session = Http2Session::spawn(peer, self.connect_timeout, self.request_timeout);
        sessions.insert(peer, session.clone());
        session
    }

    pub fn evict(&self, peer: SocketAddr) {
        self.sessions.write().remove(&peer);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for Http2ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Http2Client for Http2ClientRegistry {
    fn submit(&self, peer: SocketAddr, request: OutboundRequest, callback: ClientCallback) {
        let session = self.get_or_create(peer);
        session.submit(request, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_session_on_repeat_lookups() {
        let registry = Http2ClientRegistry::new();
        let peer: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let first = registry.get_or_create(peer);
        let second = registry.get_or_create(peer);
        assert_eq!(first.peer(), second.peer());
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn evict_forces_a_new_session_on_next_lookup() {
        let registry = Http2ClientRegistry::new();
        let peer: SocketAddr = "127.0.0.1:2".parse().unwrap();
        registry.get_or_create(peer);
        registry.evict(peer);
        assert_eq!(registry.session_count(), 0);
        registry.get_or_create(peer);
        assert_eq!(registry.session_count(), 1);
    }
}
