//! Error taxonomy for the catalog API boundary
//!
//! Every failure coming out of the transport is classified exactly once into
//! an [`ErrorKind`]:
//! - Configuration: missing, blank or malformed address or credentials
//! - Authentication: rejected credentials, or any 4xx response
//! - Network: connect failures, timeouts, request-layer failures
//! - Server: 5xx responses, responses without a status, anything unclassified
//!
//! Raw transport errors never cross the session boundary. They are kept as the
//! `source` of the classified error so diagnostics survive.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed cause carried by classified errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed set of failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Missing, blank or malformed address or credentials
    Configuration,
    /// Credentials rejected, or a client-class HTTP response
    Authentication,
    /// Transport-level failure (connect, timeout, read)
    Network,
    /// Server-class HTTP response, or an unclassified failure
    Server,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::Server => "server",
        }
    }

    /// Only network failures are worth another attempt
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every session operation
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("authentication error: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("server error: {message}")]
    Server {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    /// Malformed response body. Deliberately left outside the taxonomy.
    #[error("malformed response body: {0}")]
    Decode(#[source] io::Error),
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, source: Option<BoxError>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Configuration => Self::Configuration { message, source },
            ErrorKind::Authentication => Self::Authentication { message, source },
            ErrorKind::Network => Self::Network { message, source },
            ErrorKind::Server => Self::Server { message, source },
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message, None)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message, None)
    }

    /// Classified kind, or `None` for decode failures
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Configuration { .. } => Some(ErrorKind::Configuration),
            Self::Authentication { .. } => Some(ErrorKind::Authentication),
            Self::Network { .. } => Some(ErrorKind::Network),
            Self::Server { .. } => Some(ErrorKind::Server),
            Self::Decode(_) => None,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_retryable)
    }
}

/// Raw failure observed at the HTTP boundary, before classification
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid catalog address: {reason}")]
    InvalidAddress {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("credentials rejected by the login endpoint (status {status:?})")]
    CredentialsRejected { status: Option<u16> },
    #[error("connection failed")]
    Connect(#[source] BoxError),
    #[error("request timed out")]
    Timeout(#[source] BoxError),
    #[error("error response (status {status:?})")]
    Status { status: Option<u16> },
    #[error("request failed")]
    Request(#[source] BoxError),
    #[error("unexpected transport failure")]
    Other(#[source] BoxError),
    #[error("malformed response body")]
    Decode(#[source] io::Error),
}

impl TransportError {
    /// Map this failure onto the taxonomy. Checked in table order.
    #[must_use]
    pub fn classify(&self) -> Option<ErrorKind> {
        let kind = match self {
            Self::InvalidAddress { .. } => ErrorKind::Configuration,
            Self::CredentialsRejected { .. } => ErrorKind::Authentication,
            Self::Connect(_) | Self::Timeout(_) | Self::Request(_) => ErrorKind::Network,
            Self::Status {
                status: Some(code),
            } if (400..500).contains(code) => ErrorKind::Authentication,
            Self::Status { .. } | Self::Other(_) => ErrorKind::Server,
            Self::Decode(_) => return None,
        };
        Some(kind)
    }
}

impl From<TransportError> for SessionError {
    fn from(failure: TransportError) -> Self {
        if let TransportError::Decode(err) = failure {
            return Self::Decode(err);
        }
        let kind = failure.classify().unwrap_or(ErrorKind::Server);
        let message = failure.to_string();
        Self::new(kind, message, Some(Box::new(failure)))
    }
}
