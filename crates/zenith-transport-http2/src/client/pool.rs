//! Round-robin spread of requests across a fixed set of peers behind a
//! single logical upstream, layered on top of any `Http2Client`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ClientCallback, Http2Client, OutboundRequest};

pub struct ClientPool {
    client: Arc<dyn Http2Client>,
    peers: Vec<SocketAddr>,
    next: AtomicUsize,
}

impl ClientPool {
    pub fn new(client: Arc<dyn Http2Client>, peers: Vec<SocketAddr>) -> Self {
        assert!(!peers.is_empty(), "client pool requires at least one peer");
        Self { client, peers, next: AtomicUsize::new(0) }
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn submit(&self, request: OutboundRequest, callback: ClientCallback) {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.peers.len();
        let peer = self.peers[idx];
        self.client.submit(peer, request, callback);
    }
}
