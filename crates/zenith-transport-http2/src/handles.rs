//! The request/response handles exposed to router handlers and carried in
//! `Message` payloads (`spec.md` §3, §4.5). Both are cheap `Arc` clones
//! sharing storage owned by the network layer; `Response` additionally
//! bridges a worker thread's `close()` call back onto the connection's
//! single-threaded IO reactor, and only ever sends once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::runtime::Handle as IoHandle;

use zenith_core::ScopedResource;

struct RequestInner {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    query_params: HashMap<String, String>,
    path_params: Mutex<HashMap<String, String>>,
    body: Bytes,
}

/// Immutable, already-materialized request data. Cheap to clone, safe to
/// move across the lane boundary inside a `Message` payload.
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        headers: HashMap<String, String>,
        query_params: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                method: method.into(),
                path: path.into(),
                headers,
                query_params,
                path_params: Mutex::new(HashMap::new()),
                body,
            }),
        }
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.inner.headers.get(key).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.inner.query_params.get(key).map(String::as_str)
    }

    pub fn path_param(&self, key: &str) -> Option<String> {
        self.inner.path_params.lock().unwrap().get(key).cloned()
    }

    /// Filled in by the router once it resolves wildcard segments; the
    /// request handle is already inside the `Message` payload by then, so
    /// this mutates through the shared storage rather than rebuilding it.
    pub fn set_path_params(&self, params: HashMap<String, String>) {
        *self.inner.path_params.lock().unwrap() = params;
    }
}

/// What `close()` actually pushes onto the h2 connection's IO reactor.
enum SendTarget {
    Stream(h2::server::SendResponse<Bytes>),
}

struct PendingBody {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

struct ResponseInner {
    alive: AtomicBool,
    sent: AtomicBool,
    io_handle: IoHandle,
    target: Mutex<Option<SendTarget>>,
    staged: Mutex<PendingBody>,
    scoped_resources: Mutex<Vec<ScopedResource>>,
}

impl Drop for ResponseInner {
    fn drop(&mut self) {
        // Scoped resources (the load-shedder token, chiefly) release here
        // on every exit path: normal close, dropped-without-closing, or a
        // panic unwind through the handler.
        self.scoped_resources.lock().unwrap().clear();
    }
}

#[derive(Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

impl Response {
    pub(crate) fn new(respond: h2::server::SendResponse<Bytes>, io_handle: IoHandle) -> Self {
        Self {
            inner: Arc::new(ResponseInner {
                alive: AtomicBool::new(true),
                sent: AtomicBool::new(false),
                io_handle,
                target: Mutex::new(Some(SendTarget::Stream(respond))),
                staged: Mutex::new(PendingBody {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::new(),
                }),
                scoped_resources: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set_status(&self, status: u16) {
        self.inner.staged.lock().unwrap().status = status;
    }

    pub fn set_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .staged
            .lock()
            .unwrap()
            .headers
            .push((key.into(), value.into()));
    }

    pub fn write(&self, chunk: &[u8]) {
        let mut staged = self.inner.staged.lock().unwrap();
        let mut buf = Vec::with_capacity(staged.body.len() + chunk.len());
        buf.extend_from_slice(&staged.body);
        buf.extend_from_slice(chunk);
        staged.body = Bytes::from(buf);
    }

    /// Called by the stream's `on_close`; subsequent `close()` calls become
    /// no-ops because `alive` is checked before the frames are sent.
    pub(crate) fn mark_closed(&self) {
        self.inner.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    pub fn add_scoped_resource(&self, resource: ScopedResource) {
        self.inner.scoped_resources.lock().unwrap().push(resource);
    }

    /// Flushes the staged status/headers/body. Safe to call at most once;
    /// later calls are ignored. Posts the actual `h2` send onto the
    /// connection's single-threaded IO reactor so it never races the
    /// reactor-driven `on_close` callback that flips `alive`.
    pub fn close(&self) {
        if self.inner.sent.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = self.inner.clone();
        self.inner.io_handle.spawn(async move {
            if !inner.alive.load(Ordering::Acquire) {
                return;
            }
            let Some(SendTarget::Stream(mut respond)) = inner.target.lock().unwrap().take() else {
                return;
            };
            let staged = std::mem::replace(
                &mut *inner.staged.lock().unwrap(),
                PendingBody { status: 200, headers: Vec::new(), body: Bytes::new() },
            );
            let mut builder = http::Response::builder().status(staged.status);
            for (k, v) in &staged.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            let response = match builder.body(()) {
                Ok(response) => response,
                Err(_) => return,
            };
            match respond.send_response(response, staged.body.is_empty()) {
                Ok(mut send_stream) if !staged.body.is_empty() => {
                    let _ = send_stream.send_data(staged.body, true);
                }
                _ => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_exposes_path_and_query_params() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let mut query = HashMap::new();
        query.insert("debug".to_string(), "1".to_string());
        let request = Request::new("GET", "/abc", headers, query, Bytes::from_static(b"{}"));
        assert_eq!(request.method(), "GET");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.query_param("debug"), Some("1"));
        assert_eq!(request.path_param("code"), None);
        request.set_path_params(HashMap::from([("code".to_string(), "abc".to_string())]));
        assert_eq!(request.path_param("code"), Some("abc".to_string()));
    }
}
