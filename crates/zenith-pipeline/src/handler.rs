//! The worker-side half of the request pipeline (`spec.md` §4.5, §6). A
//! route handler on the server's IO thread builds a `PipelineMessage` and
//! submits it onto the affinity executor; a lane thread runs `handle`,
//! invokes the data-service adapter, and the adapter's callback resubmits
//! the outcome as a second message so the final `Response::close()` always
//! happens on a lane, never on the transport's IO reactor.

use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use serde_json::Value;

use zenith_core::{Message, TraceContext};
use zenith_dataservice::{DataServiceAdapter, DataServiceError, DataServiceResponse, Operation};
use zenith_executor::{AffinityExecutor, Handler};
use zenith_transport_http2::{Request, Response};

use crate::mapping::error_status;

/// Which route a dispatched request resolved to. Carried alongside the
/// request/response pair so `handle_incoming` doesn't need to re-parse the
/// path.
#[derive(Clone, Debug)]
pub enum RouteKind {
    Shorten,
    Lookup(String),
    Delete(String),
}

/// Payload shape routed through the executor. `Incoming` is built by a
/// server route handler; `DataServiceReply` is built by the adapter's
/// callback once the downstream call resolves.
pub enum PipelineMessage {
    Incoming {
        request: Request,
        response: Response,
        route: RouteKind,
    },
    DataServiceReply {
        response: Response,
        outcome: Result<DataServiceResponse, DataServiceError>,
    },
}

/// Derives a lane affinity key from a short code so that every request
/// touching the same link lands on the same lane and is observed in
/// submission order relative to its siblings.
pub fn affinity_key_for_code(code: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in code.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub struct PipelineHandler {
    adapter: Arc<DataServiceAdapter>,
    executor: OnceLock<Weak<AffinityExecutor<PipelineHandler>>>,
}

impl PipelineHandler {
    pub fn new(adapter: Arc<DataServiceAdapter>) -> Self {
        Self { adapter, executor: OnceLock::new() }
    }

    /// Wires the back-reference needed to resubmit a `DataServiceReply`
    /// once the handler has been moved into the executor that owns it.
    /// Only the first call takes effect; later calls are ignored.
    pub fn bind_executor(&self, executor: Weak<AffinityExecutor<PipelineHandler>>) {
        let _ = self.executor.set(executor);
    }

    fn handle_incoming(&self, affinity_key: u64, trace: TraceContext, request: Request, response: Response, route: RouteKind) {
        match route {
            RouteKind::Shorten => match parse_url_field(request.body()) {
                Some(_) => self.dispatch(affinity_key, trace, Operation::Save, None, request.body().clone(), response),
                None => write_error(&response, 400, "Missing 'url' field"),
            },
            RouteKind::Lookup(code) => self.dispatch(affinity_key, trace, Operation::Find, Some(code), Bytes::new(), response),
            RouteKind::Delete(code) => self.dispatch(affinity_key, trace, Operation::Delete, Some(code), Bytes::new(), response),
        }
    }

    fn dispatch(&self, affinity_key: u64, trace: TraceContext, operation: Operation, key: Option<String>, body: Bytes, response: Response) {
        let executor_ref = self.executor.get().cloned();
        self.adapter.execute(
            operation,
            key.as_deref(),
            body,
            Box::new(move |outcome| {
                // Runs on the data-service client's IO reactor thread, not
                // a lane. Resubmitting routes the eventual `close()` back
                // onto the lane that owns this affinity key instead of
                // writing the response from the reactor thread.
                let Some(executor) = executor_ref.as_ref().and_then(Weak::upgrade) else {
                    tracing::warn!("pipeline executor gone; dropping data-service reply");
                    return;
                };
                let message = Message::new(affinity_key, trace.clone(), PipelineMessage::DataServiceReply { response, outcome });
                if executor.submit(message).is_err() {
                    tracing::warn!("failed to resubmit data-service reply: executor stopped");
                }
            }),
        );
    }
}

impl Handler for PipelineHandler {
    fn handle(&self, message: Message) {
        let affinity_key = message.affinity_key;
        let trace = message.trace_context.clone();
        match message.downcast::<PipelineMessage>() {
            Ok(PipelineMessage::Incoming { request, response, route }) => {
                self.handle_incoming(affinity_key, trace, request, response, route);
            }
            Ok(PipelineMessage::DataServiceReply { response, outcome }) => {
                write_reply(&response, outcome);
            }
            Err(_) => {
                tracing::warn!("pipeline received a message with an unrecognized payload");
            }
        }
    }
}

fn write_reply(response: &Response, outcome: Result<DataServiceResponse, DataServiceError>) {
    match outcome {
        Ok(data) => {
            response.set_status(data.status);
            response.set_header("content-type", "application/json");
            response.write(&data.body);
            response.close();
        }
        Err(e) => {
            let status = error_status(&e);
            write_error(response, status, &e.to_string());
        }
    }
}

/// Writes a `{"error": "..."}` body at `status`, adding `Retry-After: 1`
/// when the status is 503 (overload or a transient downstream failure
/// mapped to it) per the stated overload response shape.
pub fn write_error(response: &Response, status: u16, message: &str) {
    let body = serde_json::json!({ "error": message }).to_string();
    response.set_status(status);
    response.set_header("content-type", "application/json");
    if status == 503 {
        response.set_header("retry-after", "1");
    }
    response.write(body.as_bytes());
    response.close();
}

fn parse_url_field(body: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("url")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_key_is_stable_for_the_same_code() {
        assert_eq!(affinity_key_for_code("abc123"), affinity_key_for_code("abc123"));
        assert_ne!(affinity_key_for_code("abc123"), affinity_key_for_code("xyz789"));
    }

    #[test]
    fn parses_url_field_out_of_a_json_body() {
        let body = Bytes::from_static(br#"{"url": "https://example.com"}"#);
        assert_eq!(parse_url_field(&body), Some("https://example.com".to_string()));
    }

    #[test]
    fn missing_url_field_is_rejected() {
        let body = Bytes::from_static(br#"{"notes": "nope"}"#);
        assert_eq!(parse_url_field(&body), None);
    }
}
