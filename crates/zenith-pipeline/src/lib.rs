//! Wires the transport, executor, load shedder, router, and data-service
//! adapter into the HTTP API surface named in `spec.md` §6:
//! `POST /shorten`, `GET /{code}`, `DELETE /{code}`, `GET /health`.

pub mod config;
pub mod error;
pub mod handler;
pub mod mapping;

pub use config::ServiceConfig;
pub use error::ApplicationError;
pub use handler::{affinity_key_for_code, PipelineHandler, PipelineMessage, RouteKind};

use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;

use zenith_core::{Message, Provider, TraceContext};
use zenith_dataservice::{DataServiceAdapter, ServiceResolver};
use zenith_executor::AffinityExecutor;
use zenith_otel::Observed;
use zenith_router::{Method, Router};
use zenith_shedder::LoadShedder;
use zenith_transport_http2::{Http2Client, Http2Server, Request, Response, RouteHandler, ServerError};

use handler::write_error;

const LINK_STORE_SERVICE: &str = "link-store";
const LINK_STORE_BASE_PATH: &str = "/api/v1/links";

/// The running service: an affinity executor behind an HTTP/2 listener.
/// Both halves are owned here so `start`/`stop` bring the whole thing up
/// and down together.
pub struct Pipeline {
    executor: Arc<AffinityExecutor<PipelineHandler>>,
    server: Http2Server,
}

impl Pipeline {
    pub fn start(&self) -> Result<(), ApplicationError> {
        self.executor.start();
        self.server.start().map_err(|e| match e {
            ServerError::BindFailed(detail) => ApplicationError::BindFailed(detail),
            ServerError::AlreadyRunning => ApplicationError::AlreadyRunning,
            ServerError::NotStarted => ApplicationError::NotStarted,
        })
    }

    pub fn stop(&self) {
        self.server.stop();
        self.executor.stop();
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }
}

/// Assembles a `Pipeline` from configuration plus the two collaborators
/// that can't be derived from config alone: the HTTP/2 client used to
/// reach the data service, and the resolver that turns its logical name
/// into a peer address.
pub fn build_pipeline(
    config: &ServiceConfig,
    http_client: Arc<dyn Http2Client>,
    resolver: Arc<dyn ServiceResolver>,
    provider: &Provider,
) -> Result<Pipeline, ApplicationError> {
    config.validate()?;

    let addr: SocketAddr = config
        .bootstrap
        .server
        .uri
        .parse()
        .map_err(|_| ApplicationError::InvalidConfig(format!("bootstrap.server.uri is not a socket address: {}", config.bootstrap.server.uri)))?;

    let adapter = Arc::new(DataServiceAdapter::new(http_client, resolver, LINK_STORE_SERVICE, LINK_STORE_BASE_PATH));
    let handler = PipelineHandler::new(adapter);
    let lane_count = config.bootstrap.execution.pool_executor.num_workers;
    let queue_capacity = config.bootstrap.execution.shared_queue.num_workers;
    let executor = Arc::new(AffinityExecutor::with_queue_capacity(lane_count, queue_capacity, handler));
    executor.handler().bind_executor(Arc::downgrade(&executor));

    let observed_executor = Observed::new(executor.clone(), "executor", provider.tracer.clone(), provider.metrics.clone());

    let shedder = LoadShedder::new(config.bootstrap.service.name.clone(), config.runtime.load_shedder.max_concurrent_requests);

    let mut router: Router<RouteHandler> = Router::new();
    router.register(
        Method::Post,
        "/shorten",
        admitted(observed_executor.clone(), shedder.clone(), |_request| RouteKind::Shorten),
    );
    router.register(
        Method::Get,
        "/:code",
        admitted(observed_executor.clone(), shedder.clone(), |request| {
            RouteKind::Lookup(request.path_param("code").unwrap_or_default())
        }),
    );
    router.register(
        Method::Delete,
        "/:code",
        admitted(observed_executor.clone(), shedder.clone(), |request| {
            RouteKind::Delete(request.path_param("code").unwrap_or_default())
        }),
    );
    router.register(Method::Get, "/health", health_handler());

    let server = Http2Server::new(addr, router);
    Ok(Pipeline { executor, server })
}

/// Builds a `RouteHandler` that admits through the shedder before
/// submitting onto the executor, and writes the stated overload response
/// when admission fails. `route_of` turns the materialized request into
/// the `RouteKind` the handler dispatches on (it runs after path params
/// are resolved, so it can read `:code`).
fn admitted(
    executor: Observed<Arc<AffinityExecutor<PipelineHandler>>>,
    shedder: LoadShedder,
    route_of: impl Fn(&Request) -> RouteKind + Send + Sync + 'static,
) -> RouteHandler {
    Arc::new(move |request: Request, response: Response| {
        let Some(token) = shedder.try_acquire() else {
            write_error(&response, 503, "Service overloaded");
            return;
        };
        response.add_scoped_resource(token);

        let route = route_of(&request);
        let affinity_key = match &route {
            RouteKind::Lookup(code) | RouteKind::Delete(code) => affinity_key_for_code(code),
            RouteKind::Shorten => rand::thread_rng().gen(),
        };
        let trace = incoming_trace_context(&request);
        let message = Message::new(affinity_key, trace.clone(), PipelineMessage::Incoming { request, response: response.clone(), route });
        let submitted = executor.observe("submit", &trace, |lane_executor| lane_executor.submit(message));
        if submitted.is_err() {
            write_error(&response, 503, "Service overloaded");
        }
    })
}

/// Starts a new trace from the request's `traceparent` header when
/// present and well-formed, otherwise mints a fresh root trace.
fn incoming_trace_context(request: &Request) -> TraceContext {
    request
        .header("traceparent")
        .and_then(|header| TraceContext::from_traceparent(header).ok())
        .unwrap_or_else(|| TraceContext::new(rand::thread_rng().gen(), rand::thread_rng().gen()))
}

/// `GET /health` bypasses the pipeline entirely: it answers directly on
/// the server's IO thread rather than crossing onto a lane.
fn health_handler() -> RouteHandler {
    Arc::new(|_request: Request, response: Response| {
        response.set_status(200);
        response.set_header("content-type", "application/json");
        response.write(br#"{"status":"ok"}"#);
        response.close();
    })
}
