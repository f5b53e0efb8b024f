//! Drives the assembled pipeline end to end against a stub data service,
//! covering the concrete scenarios of `spec.md` §8: the healthy happy
//! path, an unknown code, a bad request rejected before any data-service
//! call, and overload shedding.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use zenith_dataservice::{ServiceResolver, StaticResolver};
use zenith_pipeline::ServiceConfig;
use zenith_router::{Method, Router};
use zenith_transport_http2::{Http2Client, Http2ClientRegistry, Http2Server, Request, Response, RouteHandler};

/// A stub data service: SAVE always succeeds, FIND/DELETE 404 unless the
/// code is `"known"`. Counts SAVE calls so tests can assert a bad request
/// never reaches it.
struct StubDataService {
    save_calls: Arc<AtomicUsize>,
    delay: Duration,
}

fn build_stub(save_calls: Arc<AtomicUsize>, delay: Duration) -> Router<RouteHandler> {
    let mut router: Router<RouteHandler> = Router::new();
    let stub = Arc::new(StubDataService { save_calls, delay });

    let save_stub = stub.clone();
    router.register(
        Method::Post,
        "/api/v1/links",
        Arc::new(move |_req: Request, resp: Response| {
            save_stub.save_calls.fetch_add(1, Ordering::SeqCst);
            let delay = save_stub.delay;
            std::thread::sleep(delay);
            resp.set_status(201);
            resp.set_header("content-type", "application/json");
            resp.write(br#"{"short_code":"xY7","original_url":"http://example.com/abc"}"#);
            resp.close();
        }),
    );
    router.register(
        Method::Get,
        "/api/v1/links/:code",
        Arc::new(|req: Request, resp: Response| {
            if req.path_param("code").as_deref() == Some("known") {
                resp.set_status(200);
                resp.write(br#"{"short_code":"known","original_url":"http://example.com"}"#);
            } else {
                resp.set_status(404);
                resp.write(br#"{"error":"not found"}"#);
            }
            resp.set_header("content-type", "application/json");
            resp.close();
        }),
    );
    router
}

fn config_for(listen: &str, peer_label: &str, max_concurrent: usize) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.bootstrap.server.uri = listen.to_string();
    config.bootstrap.service.name = format!("test-{peer_label}");
    config.runtime.load_shedder.max_concurrent_requests = max_concurrent;
    config
}

async fn request(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> (u16, Bytes) {
    let stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    let (mut send_request, connection) = h2::client::handshake(stream).await.expect("handshake");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    send_request.ready().await.expect("ready");
    let http_request = http::Request::builder().method(method).uri(path).body(()).unwrap();
    let end_of_stream = body.is_empty();
    let (response_fut, mut send_stream) = send_request.send_request(http_request, end_of_stream).unwrap();
    if !end_of_stream {
        send_stream.send_data(Bytes::copy_from_slice(body), true).unwrap();
    }
    let response = response_fut.await.expect("response");
    let status = response.status().as_u16();
    let mut body_stream = response.into_body();
    let mut buf = Vec::new();
    while let Some(chunk) = body_stream.data().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    (status, Bytes::from(buf))
}

#[tokio::test(flavor = "multi_thread")]
async fn healthy_happy_path_passes_the_data_service_body_through() {
    let stub_addr: SocketAddr = "127.0.0.1:19280".parse().unwrap();
    let stub = Http2Server::new(stub_addr, build_stub(Arc::new(AtomicUsize::new(0)), Duration::from_millis(0)));
    stub.start().unwrap();

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", stub_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::new());
    let config = config_for("127.0.0.1:19281", "happy", 1000);
    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &zenith_otel::console_provider()).unwrap();
    pipeline.start().unwrap();

    let (status, body) = request(
        "127.0.0.1:19281".parse().unwrap(),
        "POST",
        "/shorten",
        br#"{"url": "http://example.com/abc"}"#,
    )
    .await;
    assert_eq!(status, 201);
    assert!(String::from_utf8_lossy(&body).contains("xY7"));

    pipeline.stop();
    stub.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_code_maps_to_404_with_an_error_body() {
    let stub_addr: SocketAddr = "127.0.0.1:19282".parse().unwrap();
    let stub = Http2Server::new(stub_addr, build_stub(Arc::new(AtomicUsize::new(0)), Duration::from_millis(0)));
    stub.start().unwrap();

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", stub_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::new());
    let config = config_for("127.0.0.1:19283", "unknown", 1000);
    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &zenith_otel::console_provider()).unwrap();
    pipeline.start().unwrap();

    let (status, body) = request("127.0.0.1:19283".parse().unwrap(), "GET", "/nope", b"").await;
    assert_eq!(status, 404);
    assert!(String::from_utf8_lossy(&body).contains("error"));

    pipeline.stop();
    stub.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_url_field_is_rejected_before_any_data_service_call() {
    let stub_addr: SocketAddr = "127.0.0.1:19284".parse().unwrap();
    let save_calls = Arc::new(AtomicUsize::new(0));
    let stub = Http2Server::new(stub_addr, build_stub(save_calls.clone(), Duration::from_millis(0)));
    stub.start().unwrap();

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", stub_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::new());
    let config = config_for("127.0.0.1:19285", "badreq", 1000);
    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &zenith_otel::console_provider()).unwrap();
    pipeline.start().unwrap();

    let (status, body) = request("127.0.0.1:19285".parse().unwrap(), "POST", "/shorten", b"{}").await;
    assert_eq!(status, 400);
    assert!(String::from_utf8_lossy(&body).contains("Missing 'url' field"));
    assert_eq!(save_calls.load(Ordering::SeqCst), 0);

    pipeline.stop();
    stub.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn a_request_over_the_shedder_cap_gets_a_503_with_retry_after() {
    let stub_addr: SocketAddr = "127.0.0.1:19286".parse().unwrap();
    let stub = Http2Server::new(stub_addr, build_stub(Arc::new(AtomicUsize::new(0)), Duration::from_millis(200)));
    stub.start().unwrap();

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", stub_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::new());
    let config = config_for("127.0.0.1:19287", "overload", 1);
    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &zenith_otel::console_provider()).unwrap();
    pipeline.start().unwrap();

    let addr: SocketAddr = "127.0.0.1:19287".parse().unwrap();
    let first = tokio::spawn(async move { request(addr, "POST", "/shorten", br#"{"url":"http://x"}"#).await });
    tokio::time::sleep(Duration::from_millis(40)).await;
    let (second_status, second_body) = request(addr, "POST", "/shorten", br#"{"url":"http://y"}"#).await;

    assert_eq!(second_status, 503);
    assert!(String::from_utf8_lossy(&second_body).contains("Service overloaded"));

    let (first_status, _) = first.await.unwrap();
    assert_eq!(first_status, 201);

    pipeline.stop();
    stub.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn an_admitted_request_is_observed_on_the_executor() {
    use zenith_core::{InProcessMetrics, Provider};
    use zenith_otel::{ConsoleLogger, ConsoleTracer};

    let stub_addr: SocketAddr = "127.0.0.1:19288".parse().unwrap();
    let stub = Http2Server::new(stub_addr, build_stub(Arc::new(AtomicUsize::new(0)), Duration::from_millis(0)));
    stub.start().unwrap();

    let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::single("link-store", stub_addr));
    let client: Arc<dyn Http2Client> = Arc::new(Http2ClientRegistry::new());
    let config = config_for("127.0.0.1:19289", "observed", 1000);
    let metrics = Arc::new(InProcessMetrics::new());
    let provider = Provider::new(Arc::new(ConsoleTracer), metrics.clone(), Arc::new(ConsoleLogger));
    let pipeline = zenith_pipeline::build_pipeline(&config, client, resolver, &provider).unwrap();
    pipeline.start().unwrap();

    // `build_pipeline` registers exactly three `Observed` instruments for
    // the executor, in this order, before any request runs.
    let success = zenith_core::InstrumentId(1);

    request("127.0.0.1:19289".parse().unwrap(), "POST", "/shorten", br#"{"url":"http://example.com/z"}"#).await;

    assert_eq!(metrics.snapshot_counter(success), 1, "submitting an admitted request should record one executor success");

    pipeline.stop();
    stub.stop();
}
