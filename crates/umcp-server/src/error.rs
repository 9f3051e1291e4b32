use thiserror::Error;

/// Failures that stop a message before protocol dispatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Client must accept both application/json and text/event-stream")]
    NotAcceptable,

    #[error("Missing session ID")]
    MissingSession,

    #[error("No valid session ID provided")]
    UnknownSession { id: String },

    #[error("Session not initialized")]
    SessionNotReady { id: String },
}
