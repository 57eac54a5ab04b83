use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeterHubError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("No handler registered for event type '{0}'")]
    HandlerMissing(String),

    #[error("Handler failed for event type '{kind}': {message}")]
    HandlerFailed { kind: String, message: String },

    #[error("Reply send failed: {0}")]
    ReplySendFailed(String),
}

pub type Result<T> = std::result::Result<T, MeterHubError>;
