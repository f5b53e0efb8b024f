use thiserror::Error;

use zenith_transport_http2::ClientError;

/// Domain-level outcomes of a data-service call, the second part of the
/// three-part Transport / Domain / Application error taxonomy. The HTTP
/// status code on a non-2xx response is the mapping source (404, 409, 400
/// each name a distinct business outcome); `status_to_domain_error` is the
/// inverse of the pipeline's `domain_status` table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("link not found")]
    LinkNotFound,
    #[error("link already exists")]
    LinkAlreadyExists,
    #[error("URL is not valid")]
    InvalidUrl,
    #[error("short code is not valid")]
    InvalidShortCode,
    #[error("link has expired")]
    LinkExpired,
    #[error("failed to generate a unique short code")]
    CodeGenerationFailed,
    #[error("domain error code {0} is unrecognized")]
    Unknown(u32),
}

/// `None` for any status that is not one of the three business outcomes a
/// data service answers with; the caller should treat those as an
/// `InfrastructureError` instead, since they aren't a decision about the
/// link, just the upstream failing.
pub fn status_to_domain_error(status: u16) -> Option<DomainError> {
    match status {
        404 => Some(DomainError::LinkNotFound),
        409 => Some(DomainError::LinkAlreadyExists),
        400 => Some(DomainError::InvalidUrl),
        _ => None,
    }
}

/// Failures that never reached a domain decision: the transport itself,
/// or a response the adapter could not interpret as either a success or a
/// recognized domain error.
#[derive(Debug, Error, Clone)]
pub enum InfrastructureError {
    #[error("connection to the data service failed")]
    ConnectionFailed,
    #[error("request to the data service timed out")]
    Timeout,
    #[error("data service protocol error: {0}")]
    Protocol(String),
    #[error("no peer could be resolved for service {0:?}")]
    UnresolvedService(String),
    #[error("response body could not be decoded: {0}")]
    MalformedResponse(String),
}

impl From<ClientError> for InfrastructureError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::ConnectionFailed | ClientError::NotConnected => {
                InfrastructureError::ConnectionFailed
            }
            ClientError::RequestTimeout => InfrastructureError::Timeout,
            ClientError::StreamClosed | ClientError::SubmitFailed => {
                InfrastructureError::Protocol(e.to_string())
            }
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum DataServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}
