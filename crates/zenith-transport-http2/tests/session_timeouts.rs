//! Session-level coverage of the two timeout paths and dead-session
//! replacement (`spec.md` §8, scenarios 5, 6, 8). Each test waits on a
//! plain channel rather than a tokio runtime, since `Http2Session` already
//! owns its own dedicated reactor thread.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use zenith_router::{Method, Router};
use zenith_transport_http2::{
    ClientError, Http2ClientRegistry, Http2Server, Http2Session, OutboundRequest, Request, Response, RouteHandler,
};

fn dummy_request() -> OutboundRequest {
    OutboundRequest {
        method: http::Method::GET,
        path: "/slow".to_string(),
        headers: Vec::new(),
        body: Bytes::new(),
    }
}

/// 192.0.2.0/24 is reserved for documentation (RFC 5737) and never routed,
/// so a connect attempt against it blackholes instead of refusing — the
/// only reliable way to force a connect timeout rather than an immediate
/// "connection refused".
const UNROUTABLE_PEER: &str = "192.0.2.1:81";

#[test]
fn connect_timeout_is_reported_as_connection_failed() {
    let peer: SocketAddr = UNROUTABLE_PEER.parse().unwrap();
    let session = Http2Session::spawn(peer, Duration::from_millis(80), Duration::from_secs(5));

    let (tx, rx) = mpsc::channel();
    session.submit(
        dummy_request(),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );

    let result = rx.recv_timeout(Duration::from_millis(500)).expect("callback fires within the connect timeout window");
    assert!(matches!(result, Err(ClientError::ConnectionFailed)));
}

#[test]
fn request_timeout_fires_when_the_peer_never_replies() {
    let addr: SocketAddr = "127.0.0.1:19190".parse().unwrap();
    let mut router: Router<RouteHandler> = Router::new();
    router.register(
        Method::Get,
        "/slow",
        Arc::new(|_req: Request, resp: Response| {
            std::thread::sleep(Duration::from_millis(400));
            resp.set_status(200);
            resp.write(b"too late");
            resp.close();
        }),
    );
    let server = Http2Server::new(addr, router);
    server.start().expect("server starts");

    let session = Http2Session::spawn(addr, Duration::from_millis(200), Duration::from_millis(80));
    let (tx, rx) = mpsc::channel();
    session.submit(
        dummy_request(),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );

    let result = rx.recv_timeout(Duration::from_millis(500)).expect("callback fires within the request timeout window");
    assert!(matches!(result, Err(ClientError::RequestTimeout)));

    server.stop();
}

#[test]
fn dead_session_is_replaced_on_next_registry_lookup() {
    let peer: SocketAddr = UNROUTABLE_PEER.parse().unwrap();
    let registry = Http2ClientRegistry::with_timeouts(Duration::from_millis(80), Duration::from_secs(5));

    let first = registry.get_or_create(peer);
    let (tx, rx) = mpsc::channel();
    first.submit(
        dummy_request(),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.recv_timeout(Duration::from_millis(500)).expect("first session's connect attempt fails");

    let deadline = std::time::Instant::now() + Duration::from_millis(500);
    while !first.is_dead() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(first.is_dead(), "session should be marked dead after a failed connect");

    let second = registry.get_or_create(peer);
    assert!(!second.is_dead(), "registry should hand back a fresh, not-yet-dead session");
    assert_eq!(registry.session_count(), 1);
}

#[test]
fn a_connection_closed_by_the_peer_marks_the_session_dead() {
    let addr: SocketAddr = "127.0.0.1:19191".parse().unwrap();
    let mut router: Router<RouteHandler> = Router::new();
    router.register(
        Method::Get,
        "/slow",
        Arc::new(|_req: Request, resp: Response| {
            resp.set_status(200);
            resp.write(b"ok");
            resp.close();
        }),
    );
    let server = Http2Server::new(addr, router);
    server.start().expect("server starts");

    let session = Http2Session::spawn(addr, Duration::from_millis(200), Duration::from_secs(5));
    let (tx, rx) = mpsc::channel();
    session.submit(
        dummy_request(),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.recv_timeout(Duration::from_millis(500)).expect("first request completes over the live connection");
    assert!(!session.is_dead());

    // Dropping the server's runtime aborts every task spawned on it,
    // including the one driving this client's connection — the peer-close
    // path, not a client-side failure.
    server.stop();

    let deadline = std::time::Instant::now() + Duration::from_millis(1000);
    while !session.is_dead() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(session.is_dead(), "session should be marked dead once the peer closes the connection");
}
