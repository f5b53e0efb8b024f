//! HTTP/2 transport: the server adapter (C6), the response-writer-backed
//! request/response handles (C5), and the client session/registry/
//! dispatcher/pool (C8) described in `spec.md` §4.5, §4.6 and §4.8.

pub mod client;
pub mod error;
pub mod handles;
pub mod server;

pub use client::{
    dispatcher::Http2ClientDispatcher, pool::ClientPool, registry::Http2ClientRegistry,
    ClientCallback, ClientResponse, Http2Client, Http2Session, OutboundRequest, SessionState,
};
pub use error::ClientError;
pub use handles::{Request, Response};
pub use server::{Http2Server, RouteHandler, ServerError};
