//! IO-thread-owned alternative to the registry. Where `Http2ClientRegistry`
//! exists because callers on arbitrary worker lanes need a shared,
//! lock-guarded map, the dispatcher is for call sites that are already
//! running on a single thread (e.g. logic folded directly into an accept
//! loop) and never call it concurrently with itself. The map still sits
//! behind a `Mutex` as a correctness backstop, but the access pattern it
//! is designed for never contends on it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ClientCallback, Http2Client, Http2Session, OutboundRequest, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};

pub struct Http2ClientDispatcher {
    sessions: Mutex<HashMap<SocketAddr, Http2Session>>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Http2ClientDispatcher {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            connect_timeout,
            request_timeout,
        }
    }

    fn session_for(&self, peer: SocketAddr) -> Http2Session {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(&peer) {
            if !session.is_dead() {
                return session.clone();
            }
        }
        let session = Http2Session::spawn(peer, self.connect_timeout, self.request_timeout);
        sessions.insert(peer, session.clone());
        session
    }
}

impl Default for Http2ClientDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Http2Client for Http2ClientDispatcher {
    fn submit(&self, peer: SocketAddr, request: OutboundRequest, callback: ClientCallback) {
        let session = self.session_for(peer);
        session.submit(request, callback);
    }
}
