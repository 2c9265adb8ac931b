//! Error types for duesync-tasks.

use thiserror::Error;

/// Failures talking to the task service.
///
/// [`TaskServiceError::NotFound`] is the only variant the reconciliation
/// engine treats as a state change; every other variant is transient.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// The task or list is unknown remotely (HTTP 404 / 410).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response.
    #[error("task service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[source] std::io::Error),

    #[error("no access token; set {0}")]
    MissingToken(&'static str),
}

impl TaskServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskServiceError::NotFound(_))
    }
}
