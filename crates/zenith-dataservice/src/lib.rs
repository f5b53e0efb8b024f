//! Protocol-agnostic data-service adapter (`spec.md` C9): maps SAVE/FIND/
//! DELETE/EXISTS onto HTTP verbs against a configurable base path,
//! resolves the target peer through a `ServiceResolver`, and translates
//! the HTTP2 client's response into a domain or infrastructure outcome.

mod error;
mod operation;
mod resolver;

pub use error::{status_to_domain_error, DataServiceError, DomainError, InfrastructureError};
pub use operation::Operation;
pub use resolver::{ServiceResolver, StaticResolver};

use std::sync::Arc;

use bytes::Bytes;

use zenith_transport_http2::{Http2Client, OutboundRequest};

#[derive(Debug, Clone)]
pub struct DataServiceResponse {
    pub status: u16,
    pub body: Bytes,
}

pub type DataServiceCallback = Box<dyn FnOnce(Result<DataServiceResponse, DataServiceError>) + Send>;

pub struct DataServiceAdapter {
    client: Arc<dyn Http2Client>,
    resolver: Arc<dyn ServiceResolver>,
    service_name: String,
    base_path: String,
}

impl DataServiceAdapter {
    pub fn new(
        client: Arc<dyn Http2Client>,
        resolver: Arc<dyn ServiceResolver>,
        service_name: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            resolver,
            service_name: service_name.into(),
            base_path: base_path.into(),
        }
    }

    pub fn execute(&self, operation: Operation, key: Option<&str>, body: Bytes, callback: DataServiceCallback) {
        let Some(peer) = self.resolver.resolve(&self.service_name) else {
            callback(Err(DataServiceError::Infrastructure(
                InfrastructureError::UnresolvedService(self.service_name.clone()),
            )));
            return;
        };

        let request = OutboundRequest {
            method: operation.http_method(),
            path: operation.path(&self.base_path, key),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        };

        self.client.submit(
            peer,
            request,
            Box::new(move |result| {
                let outcome = match result {
                    Ok(response) => interpret(response.status, response.body),
                    Err(e) => Err(DataServiceError::Infrastructure(e.into())),
                };
                callback(outcome);
            }),
        );
    }
}

fn interpret(status: u16, body: Bytes) -> Result<DataServiceResponse, DataServiceError> {
    if (200..300).contains(&status) {
        return Ok(DataServiceResponse { status, body });
    }
    match status_to_domain_error(status) {
        Some(domain) => Err(DataServiceError::Domain(domain)),
        None => Err(DataServiceError::Infrastructure(InfrastructureError::Protocol(format!(
            "data service responded with status {status}"
        )))),
    }
}
