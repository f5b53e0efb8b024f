//! HTTP/2 server adapter (`spec.md` C6). Binds a listener on a dedicated
//! OS thread running a current-thread Tokio runtime, accepts connections,
//! and for every resolved stream materializes a `Request`/`Response` pair
//! and hands it to the registered route handler. The handler itself runs
//! synchronously on the IO thread's task — it is expected to be cheap
//! (typically: derive an affinity key and `submit` onto the executor).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, warn};

use zenith_router::{Method as RouterMethod, Router};

use crate::handles::{Request, Response};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyRunning,
    #[error("server has not been started")]
    NotStarted,
    #[error("failed to bind listener: {0}")]
    BindFailed(String),
}

/// Invoked synchronously on the IO thread once a request's route and body
/// have been resolved. Implementations should be non-blocking.
pub type RouteHandler = Arc<dyn Fn(Request, Response) + Send + Sync>;

pub struct Http2Server {
    addr: SocketAddr,
    router: Arc<Router<RouteHandler>>,
    started: AtomicBool,
    acceptor_thread: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Http2Server {
    pub fn new(addr: SocketAddr, router: Router<RouteHandler>) -> Self {
        Self {
            addr,
            router: Arc::new(router),
            started: AtomicBool::new(false),
            acceptor_thread: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Binds and spawns the accept loop. Blocks until the bind attempt
    /// completes (successfully or not) so callers observe `BindFailed`
    /// synchronously instead of racing the acceptor thread.
    pub fn start(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyRunning);
        }
        let addr = self.addr;
        let router = self.router.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), ServerError>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let join = std::thread::Builder::new()
            .name("zenith-http2-acceptor".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(ServerError::BindFailed(e.to_string())));
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match TcpListener::bind(addr).await {
                        Ok(listener) => listener,
                        Err(e) => {
                            let _ = ready_tx.send(Err(ServerError::BindFailed(e.to_string())));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    accept_loop(listener, router, shutdown_rx).await;
                });
            })
            .expect("failed to spawn zenith-http2-acceptor thread");

        *self.acceptor_thread.lock().unwrap() = Some(join);
        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);

        match ready_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(ServerError::BindFailed(
                "acceptor thread exited before binding".to_string(),
            )),
        }
    }

    /// Idempotent. Signals the accept loop to stop taking new connections
    /// and joins the acceptor thread; in-flight streams finish on their own
    /// spawned tasks and are not forcibly cut off.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.acceptor_thread.lock().unwrap().take() {
            if join.join().is_err() {
                error!("zenith-http2-acceptor thread panicked during shutdown");
            }
        }
        self.started.store(false, Ordering::Release);
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for Http2Server {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<Router<RouteHandler>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, router).await {
                        warn!(error = %e, "http/2 connection ended with an error");
                    }
                });
            }
            _ = &mut shutdown_rx => {
                break;
            }
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    router: Arc<Router<RouteHandler>>,
) -> Result<(), h2::Error> {
    let mut connection = h2::server::handshake(stream).await?;
    let io_handle = tokio::runtime::Handle::current();
    while let Some(result) = connection.accept().await {
        let (request, respond) = result?;
        let router = router.clone();
        let io_handle = io_handle.clone();
        tokio::spawn(async move {
            dispatch(request, respond, router, io_handle).await;
        });
    }
    Ok(())
}

async fn dispatch(
    request: http::Request<h2::RecvStream>,
    respond: h2::server::SendResponse<Bytes>,
    router: Arc<Router<RouteHandler>>,
    io_handle: tokio::runtime::Handle,
) {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query_params = parse_query(request.uri().query().unwrap_or(""));
    let headers = request
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = collect_body(request.into_body()).await;

    let handle = Request::new(method.as_str(), &path, headers, query_params, body);
    let response = Response::new(respond, io_handle);

    let Some(router_method) = to_router_method(&method) else {
        response.set_status(405);
        response.close();
        return;
    };

    match router.route(router_method, &path) {
        Some(matched) => {
            handle.set_path_params(matched.params);
            (matched.handler)(handle, response);
        }
        None => {
            response.set_status(404);
            response.close();
        }
    }
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

fn parse_query(raw: &str) -> std::collections::HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn to_router_method(method: &http::Method) -> Option<RouterMethod> {
    match *method {
        http::Method::GET => Some(RouterMethod::Get),
        http::Method::POST => Some(RouterMethod::Post),
        http::Method::DELETE => Some(RouterMethod::Delete),
        http::Method::HEAD => Some(RouterMethod::Head),
        http::Method::PUT => Some(RouterMethod::Put),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_parse_simple_pairs() {
        let params = parse_query("debug=1&code=abc");
        assert_eq!(params.get("debug"), Some(&"1".to_string()));
        assert_eq!(params.get("code"), Some(&"abc".to_string()));
    }

    #[test]
    fn query_params_handle_empty_string() {
        assert!(parse_query("").is_empty());
    }
}
