use thiserror::Error;

/// Application-level errors, the third part of the Transport / Domain /
/// Application taxonomy — failures in standing the service up rather than
/// in serving any one request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to create server: {0}")]
    ServerCreationFailed(String),
    #[error("service is already running")]
    AlreadyRunning,
    #[error("service has not been started")]
    NotStarted,
    #[error("failed to bind: {0}")]
    BindFailed(String),
}
