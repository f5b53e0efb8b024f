//! HTTP/2 client session (`spec.md` C8). Each session owns a dedicated OS
//! thread running a current-thread Tokio runtime — the session's private
//! IO reactor — and connects lazily on the first submitted request. While
//! connecting, further submissions queue in a FIFO and are flushed once
//! the handshake resolves; a failed handshake fails every queued request
//! and marks the session dead so the registry replaces it.

pub mod dispatcher;
pub mod registry;
pub mod pool;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::error::ClientError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(200);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Dead,
}

const DISCONNECTED: u8 = 0;
const CONNECTING: u8 = 1;
const CONNECTED: u8 = 2;
const DEAD: u8 = 3;

fn decode_state(raw: u8) -> SessionState {
    match raw {
        DISCONNECTED => SessionState::Disconnected,
        CONNECTING => SessionState::Connecting,
        CONNECTED => SessionState::Connected,
        _ => SessionState::Dead,
    }
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: http::Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

pub type ClientCallback = Box<dyn FnOnce(Result<ClientResponse, ClientError>) + Send>;

/// The one contract every client surface (a lone session, the registry, or
/// the IO-thread dispatcher) implements: submit a request, get exactly one
/// callback invocation back — success, transport failure, or timeout.
pub trait Http2Client: Send + Sync {
    fn submit(&self, peer: SocketAddr, request: OutboundRequest, callback: ClientCallback);
}

struct ClientJob {
    request: OutboundRequest,
    callback: ClientCallback,
}

#[derive(Clone)]
pub struct Http2Session {
    peer: SocketAddr,
    state: Arc<AtomicU8>,
    job_tx: UnboundedSender<ClientJob>,
}

impl Http2Session {
    /// Spawns the reactor thread immediately; the TCP connection itself is
    /// not attempted until the first `submit`.
    pub fn spawn(peer: SocketAddr, connect_timeout: Duration, request_timeout: Duration) -> Self {
        let state = Arc::new(AtomicU8::new(DISCONNECTED));
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let reactor_state = state.clone();
        std::thread::Builder::new()
            .name(format!("zenith-http2-client-{peer}"))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!(error = %e, %peer, "failed to build client reactor runtime");
                        reactor_state.store(DEAD, Ordering::Release);
                        return;
                    }
                };
                runtime.block_on(run_reactor(peer, job_rx, reactor_state, connect_timeout, request_timeout));
            })
            .expect("failed to spawn zenith-http2-client thread");
        Self { peer, state, job_tx }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        decode_state(self.state.load(Ordering::Acquire))
    }

    pub fn is_dead(&self) -> bool {
        self.state() == SessionState::Dead
    }

    pub fn submit(&self, request: OutboundRequest, callback: ClientCallback) {
        let job = ClientJob { request, callback };
        if let Err(send_err) = self.job_tx.send(job) {
            (send_err.0.callback)(Err(ClientError::NotConnected));
        }
    }
}

async fn run_reactor(
    peer: SocketAddr,
    mut jobs: UnboundedReceiver<ClientJob>,
    state: Arc<AtomicU8>,
    connect_timeout: Duration,
    request_timeout: Duration,
) {
    let mut send_request: Option<h2::client::SendRequest<Bytes>> = None;
    let mut pending: VecDeque<ClientJob> = VecDeque::new();

    while let Some(job) = jobs.recv().await {
        pending.push_back(job);

        // The background driver task is the only thing that notices the
        // peer closing the connection; once it has, treat the cached
        // `SendRequest` as gone so the next job reconnects instead of
        // handing every request to a session nothing is driving anymore.
        if decode_state(state.load(Ordering::Acquire)) == SessionState::Dead {
            send_request = None;
        }

        if send_request.is_none() {
            state.store(CONNECTING, Ordering::Release);
            match connect(peer, connect_timeout).await {
                Ok((sr, connection)) => {
                    let closed_state = state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            warn!(error = %e, %peer, "h2 connection driver ended with an error");
                        } else {
                            warn!(%peer, "h2 connection closed by peer");
                        }
                        closed_state.store(DEAD, Ordering::Release);
                    });
                    send_request = Some(sr);
                    state.store(CONNECTED, Ordering::Release);
                }
                Err(()) => {
                    state.store(DEAD, Ordering::Release);
                    for queued in pending.drain(..) {
                        (queued.callback)(Err(ClientError::ConnectionFailed));
                    }
                    continue;
                }
            }
        }

        let sr = send_request.as_ref().expect("connected branch sets send_request");
        while let Some(queued) = pending.pop_front() {
            spawn_request(sr.clone(), queued, request_timeout, peer);
        }
    }
}

async fn connect(
    peer: SocketAddr,
    timeout: Duration,
) -> Result<(h2::client::SendRequest<Bytes>, h2::client::Connection<TcpStream, Bytes>), ()> {
    tokio::time::timeout(timeout, async move {
        let stream = TcpStream::connect(peer).await.map_err(|_| ())?;
        h2::client::handshake(stream).await.map_err(|_| ())
    })
    .await
    .map_err(|_| ())?
}

fn spawn_request(
    mut sr: h2::client::SendRequest<Bytes>,
    job: ClientJob,
    request_timeout: Duration,
    peer: SocketAddr,
) {
    tokio::spawn(async move {
        let ClientJob { request, callback } = job;
        if sr.ready().await.is_err() {
            callback(Err(ClientError::ConnectionFailed));
            return;
        }
        let mut builder = http::Request::builder().method(request.method).uri(request.path);
        for (k, v) in &request.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        let http_request = match builder.body(()) {
            Ok(req) => req,
            Err(_) => {
                callback(Err(ClientError::SubmitFailed));
                return;
            }
        };
        let end_of_stream = request.body.is_empty();
        let (response_fut, mut send_stream) = match sr.send_request(http_request, end_of_stream) {
            Ok(pair) => pair,
            Err(_) => {
                callback(Err(ClientError::SubmitFailed));
                return;
            }
        };
        if !end_of_stream {
            let _ = send_stream.send_data(request.body, true);
        }

        // `select!` drops whichever branch loses, so only one of these
        // ever runs to completion — the flag makes that "exactly once"
        // contract explicit rather than implicit in the macro's semantics.
        let completed = Arc::new(AtomicBool::new(false));
        tokio::select! {
            result = response_fut => {
                if completed.swap(true, Ordering::AcqRel) {
                    return;
                }
                match result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        let headers: Vec<(String, String)> = response
                            .headers()
                            .iter()
                            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
                            .collect();
                        let body = collect_body(response.into_body()).await;
                        callback(Ok(ClientResponse { status, headers, body }));
                    }
                    Err(_) => callback(Err(ClientError::StreamClosed)),
                }
            }
            _ = tokio::time::sleep(request_timeout) => {
                if completed.swap(true, Ordering::AcqRel) {
                    return;
                }
                warn!(%peer, "request exceeded its deadline");
                callback(Err(ClientError::RequestTimeout));
            }
        }
    });
}

async fn collect_body(mut body: h2::RecvStream) -> Bytes {
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        match chunk {
            Ok(data) => {
                let len = data.len();
                buf.extend_from_slice(&data);
                let _ = body.flow_control().release_capacity(len);
            }
            Err(_) => break,
        }
    }
    Bytes::from(buf)
}

impl Http2Client for Http2Session {
    fn submit(&self, peer: SocketAddr, request: OutboundRequest, callback: ClientCallback) {
        debug_assert_eq!(peer, self.peer, "session submitted to with a mismatched peer");
        Http2Session::submit(self, request, callback);
    }
}
