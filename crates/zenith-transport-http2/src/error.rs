use thiserror::Error;

/// Transport-level errors, the first of `spec.md`'s three-part error
/// taxonomy (Transport / Domain / Application).
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    #[error("connection to peer failed")]
    ConnectionFailed,
    #[error("request exceeded its deadline")]
    RequestTimeout,
    #[error("stream closed by peer")]
    StreamClosed,
    #[error("session is not connected")]
    NotConnected,
    #[error("failed to submit request to the h2 session")]
    SubmitFailed,
}
