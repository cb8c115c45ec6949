//! Error types for the client.

use std::time::Duration;
use thiserror::Error;
use timeclock_protocol::Role;
use timeclock_storage::StorageError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP status of the unauthorized class.
pub const UNAUTHORIZED: u16 = 401;

/// The server could not be reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// No response before the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other network-level failure.
    #[error("network error: {0}")]
    Other(String),
}

/// A request that did not produce a usable response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The server answered with status >= 400.
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Server-provided `message`, or a generic description.
        message: String,
    },

    /// The server was not reached.
    #[error(transparent)]
    Transport(#[from] TransportFailure),

    /// The response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The request body could not be encoded.
    #[error("invalid request body: {0}")]
    Encode(String),
}

impl RequestError {
    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(UNAUTHORIZED)
    }

    /// Returns true if the server was not reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, RequestError::Transport(_))
    }
}

/// Errors surfaced by sessions, records and clock actions.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The login exchange failed; no state was changed.
    #[error("authentication failed: {0}")]
    Authentication(#[source] RequestError),

    /// The action requires a signed-in session.
    #[error("user not authenticated")]
    NotAuthenticated,

    /// Another clock action is still in flight.
    #[error("a clock action is already in progress")]
    OperationInProgress,

    /// The clock action was rolled back.
    #[error("clock action failed: {cause}")]
    ClockActionFailed {
        /// Underlying request failure.
        #[source]
        cause: RequestError,
    },

    /// The signed-in role may not call this endpoint.
    #[error("permission denied for role {0}")]
    PermissionDenied(Role),

    /// Any other request failure.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Returns the request failure behind this error, if any.
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            ClientError::Authentication(e)
            | ClientError::ClockActionFailed { cause: e }
            | ClientError::Request(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_classification() {
        let unauthorized = RequestError::HttpStatus {
            status: 401,
            message: "token expired".into(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_transport());
        assert_eq!(unauthorized.status(), Some(401));

        let timeout = RequestError::from(TransportFailure::Timeout(Duration::from_secs(10)));
        assert!(timeout.is_transport());
        assert_eq!(timeout.status(), None);
    }

    #[test]
    fn error_display() {
        let err = RequestError::HttpStatus {
            status: 500,
            message: "Server error".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: Server error");

        let err = ClientError::ClockActionFailed {
            cause: TransportFailure::Connect("refused".into()).into(),
        };
        assert_eq!(
            err.to_string(),
            "clock action failed: connection failed: refused"
        );
        assert_eq!(
            ClientError::OperationInProgress.to_string(),
            "a clock action is already in progress"
        );
    }

    #[test]
    fn request_error_is_reachable_from_wrappers() {
        let err = ClientError::Authentication(RequestError::Decode("missing token".into()));
        assert!(matches!(err.request_error(), Some(RequestError::Decode(_))));
        assert!(ClientError::NotAuthenticated.request_error().is_none());
    }
}
